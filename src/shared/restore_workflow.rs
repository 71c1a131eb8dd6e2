use crate::config::Config;
use crate::errors::RestoreServiceError;
use crate::fetch::DumpFetcher;
use crate::shared::commands::ContainerCommandExecutor;
use crate::shared::display::DisplayFormatter;
use crate::utils::remove_artifact;
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Fetch,
    Restore,
    Cleanup,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Fetch => "fetch",
            Step::Restore => "restore",
            Step::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed { reason: String },
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: Step,
    #[serde(flatten)]
    pub status: StepStatus,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
}

impl StepReport {
    pub fn failed(&self) -> bool {
        matches!(self.status, StepStatus::Failed { .. })
    }
}

/// Outcome of one workflow run
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub release: String,
    pub url: String,
    pub dump_path: String,
    pub restore_command: String,
    pub strict: bool,
    pub steps: Vec<StepReport>,
}

impl WorkflowReport {
    #[cfg(test)]
    pub fn step(&self, step: Step) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.step == step)
    }

    /// Strict runs fail on the first failed step. Default runs only fail
    /// when the last step (cleanup) failed, like a script's exit status.
    pub fn exit_result(&self) -> Result<(), RestoreServiceError> {
        let failed = if self.strict {
            self.steps.iter().find(|s| s.failed())
        } else {
            self.steps.last().filter(|s| s.failed())
        };

        match failed {
            Some(StepReport {
                step,
                status: StepStatus::Failed { reason },
                ..
            }) => Err(RestoreServiceError::StepFailed {
                step: step.to_string(),
                reason: reason.clone(),
            }),
            _ => Ok(()),
        }
    }
}

/// Fetch, restore and clean up a release dump, strictly in that order
pub struct RestoreWorkflow {
    config: Config,
    fetcher: DumpFetcher,
    executor: ContainerCommandExecutor,
    strict: bool,
    json_output: bool,
}

impl RestoreWorkflow {
    /// With `json_output` the human summary is skipped and psql output is
    /// kept off stdout, which carries the report instead
    pub fn new(config: Config, strict: bool, json_output: bool) -> Result<Self, RestoreServiceError> {
        let fetcher = DumpFetcher::new()?;
        let executor = ContainerCommandExecutor::new(&config).with_stdout_to_stderr(json_output);
        Ok(Self {
            config,
            fetcher,
            executor,
            strict,
            json_output,
        })
    }

    #[cfg(test)]
    pub fn with_executor(mut self, executor: ContainerCommandExecutor) -> Self {
        self.executor = executor.with_stdout_to_stderr(self.json_output);
        self
    }

    /// Execute the complete restore workflow. Failures are recorded in the
    /// report; cleanup runs in every case.
    pub async fn execute(&self) -> WorkflowReport {
        let url = self.config.download_url();
        let dump_path = self.config.dump_path();
        let mut steps = Vec::with_capacity(3);

        // Phase 1: Fetch
        info!(release = %self.config.release, url = %url, "Downloading latest release");
        let started = Instant::now();
        let fetch = self.fetcher.fetch(&url, &dump_path).await.map(Some);
        let fetch_report = finish_step(Step::Fetch, started, fetch);
        let fetch_failed = fetch_report.failed();
        steps.push(fetch_report);

        // Phase 2: Restore
        if self.strict && fetch_failed {
            info!("Skipping restore, no dump was downloaded");
            steps.push(StepReport {
                step: Step::Restore,
                status: StepStatus::Skipped,
                elapsed_ms: 0,
                bytes: None,
            });
        } else {
            info!(container = %self.config.container, "Restoring Database to dockerized {}", self.config.container);
            let started = Instant::now();
            let restore = self.executor.restore_from_file(&dump_path).await.map(|_| None);
            steps.push(finish_step(Step::Restore, started, restore));
        }

        // Phase 3: Cleanup
        info!(path = %dump_path.display(), "Cleaning up artifacts");
        let started = Instant::now();
        let cleanup = remove_artifact(&dump_path).await.map(|_| None);
        steps.push(finish_step(Step::Cleanup, started, cleanup));

        let report = WorkflowReport {
            release: self.config.release.clone(),
            url,
            dump_path: dump_path.display().to_string(),
            restore_command: self.executor.restore_command_line(),
            strict: self.strict,
            steps,
        };

        if !self.json_output {
            DisplayFormatter::display_workflow_summary(&report);
        }
        report
    }
}

fn finish_step(
    step: Step,
    started: Instant,
    result: Result<Option<u64>, RestoreServiceError>,
) -> StepReport {
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(bytes) => StepReport {
            step,
            status: StepStatus::Succeeded,
            elapsed_ms,
            bytes,
        },
        Err(e) => {
            error!(step = %step, error = %e, "Step failed");
            StepReport {
                step,
                status: StepStatus::Failed {
                    reason: e.to_string(),
                },
                elapsed_ms,
                bytes: None,
            }
        }
    }
}
