use crate::shared::restore_workflow::{StepReport, StepStatus, WorkflowReport};
use crate::utils::format_bytes;
use tracing::{info, warn};

/// Display formatter for workflow summaries
pub struct DisplayFormatter;

impl DisplayFormatter {
    /// Display the restore summary after all steps ran
    pub fn display_workflow_summary(report: &WorkflowReport) {
        info!("");
        info!("Restore Summary:");
        info!("  Release: {}", report.release);
        info!("  Source: {}", report.url);
        info!("  Restore command: {}", report.restore_command);

        for step in &report.steps {
            Self::display_step_line(step);
        }

        if report.steps.iter().any(StepReport::failed) {
            warn!("Workflow finished with failures");
        } else {
            info!("Workflow completed successfully");
        }
    }

    fn display_step_line(step: &StepReport) {
        let detail = Self::step_detail(step);
        match &step.status {
            StepStatus::Failed { .. } => warn!("  {:<8} {}", step.step.to_string(), detail),
            _ => info!("  {:<8} {}", step.step.to_string(), detail),
        }
    }

    /// One-line description of a step outcome
    pub fn step_detail(step: &StepReport) -> String {
        match &step.status {
            StepStatus::Succeeded => match step.bytes {
                Some(bytes) => format!("ok ({}, {} ms)", format_bytes(bytes), step.elapsed_ms),
                None => format!("ok ({} ms)", step.elapsed_ms),
            },
            StepStatus::Failed { reason } => format!("failed: {}", reason),
            StepStatus::Skipped => "skipped".to_string(),
        }
    }
}
