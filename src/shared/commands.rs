use crate::config::Config;
use crate::errors::RestoreServiceError;
use crate::shared::constants::PSQL_BIN;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs psql inside the database container through the container runtime
pub struct ContainerCommandExecutor {
    program: String,
    restore_args: Vec<String>,
    container: String,
    db_user: String,
    stdout_to_stderr: bool,
}

impl ContainerCommandExecutor {
    pub fn new(config: &Config) -> Self {
        Self {
            program: config.docker_bin.clone(),
            restore_args: psql_exec_args(&config.container, &config.db_user),
            container: config.container.clone(),
            db_user: config.db_user.clone(),
            stdout_to_stderr: false,
        }
    }

    /// Send the restore command's stdout to our stderr, leaving stdout free
    /// for machine-readable output
    pub fn with_stdout_to_stderr(mut self, enabled: bool) -> Self {
        self.stdout_to_stderr = enabled;
        self
    }

    /// Replace the restore invocation, keeping the container and role used for error context
    #[cfg(test)]
    pub fn with_restore_command(mut self, program: &str, args: &[&str]) -> Self {
        self.program = program.to_string();
        self.restore_args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Full restore command line, for logging and reports
    pub fn restore_command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.restore_args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Stream the dump file as stdin of the restore command
    pub async fn restore_from_file(&self, dump_path: &Path) -> Result<(), RestoreServiceError> {
        let dump = tokio::fs::File::open(dump_path)
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RestoreServiceError::DumpMissing(dump_path.display().to_string())
                } else {
                    RestoreServiceError::IoError(e)
                }
            })?
            .into_std()
            .await;
        let stdout = if self.stdout_to_stderr {
            Stdio::from(std::io::stderr())
        } else {
            Stdio::inherit()
        };

        debug!(command = %self.restore_command_line(), dump = %dump_path.display(), "Executing restore command");

        let output = Command::new(&self.program)
            .args(&self.restore_args)
            .stdin(Stdio::from(dump))
            .stdout(stdout)
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|_| {
                RestoreServiceError::CommandNotFound(format!("Failed to execute {}", self.program))
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            warn!(container = %self.container, "{}", line);
        }

        if output.status.success() {
            Ok(())
        } else {
            Err(self.classify_failure(&stderr, output.status.code()))
        }
    }

    /// Check that the runtime answers and the container is running
    pub async fn container_running(&self) -> Result<bool, RestoreServiceError> {
        debug!(container = %self.container, "Inspecting container");

        let output = Command::new(&self.program)
            .args(["inspect", "-f", "{{.State.Running}}", self.container.as_str()])
            .output()
            .await
            .map_err(|_| {
                RestoreServiceError::CommandNotFound(format!("Failed to execute {}", self.program))
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim() == "true")
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            match RestoreServiceError::from_stderr(&stderr, &self.container) {
                RestoreServiceError::ContainerNotFound(_) => Ok(false),
                e => Err(e),
            }
        }
    }

    fn classify_failure(&self, stderr: &str, code: Option<i32>) -> RestoreServiceError {
        if stderr.trim().is_empty() {
            return RestoreServiceError::CommandFailed(format!(
                "{} exited with status {:?}",
                self.program, code
            ));
        }
        match RestoreServiceError::from_stderr(stderr, &self.container) {
            RestoreServiceError::AuthenticationFailed(_) => {
                RestoreServiceError::AuthenticationFailed(self.db_user.clone())
            }
            e => e,
        }
    }
}

/// Arguments for `docker exec -i <container> psql -U <user>`
pub fn psql_exec_args(container: &str, db_user: &str) -> Vec<String> {
    ["exec", "-i", container, PSQL_BIN, "-U", db_user]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_restore_command_line_defaults() {
        let executor = ContainerCommandExecutor::new(&Config::default());
        assert_eq!(
            executor.restore_command_line(),
            "docker exec -i postgres psql -U postgres"
        );
    }

    #[test]
    fn test_psql_exec_args_custom_container() {
        assert_eq!(
            psql_exec_args("pg-test", "moneybot"),
            vec!["exec", "-i", "pg-test", "psql", "-U", "moneybot"]
        );
    }

    #[tokio::test]
    async fn test_restore_streams_exact_dump_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("07-14-17.sql");
        let captured = dir.path().join("captured.sql");
        let body: Vec<u8> = b"BEGIN;\nINSERT INTO t VALUES (1);\nCOMMIT;\n"
            .iter()
            .copied()
            .chain((0..=255u8).cycle().take(64 * 1024))
            .collect();
        fs::write(&dump, &body).unwrap();

        let script = format!("cat > '{}'", captured.display());
        let executor = ContainerCommandExecutor::new(&Config::default())
            .with_restore_command("sh", &["-c", &script]);

        executor.restore_from_file(&dump).await.unwrap();

        assert_eq!(fs::read(&captured).unwrap(), body);
    }

    #[tokio::test]
    async fn test_restore_with_stdout_on_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("07-14-17.sql");
        let captured = dir.path().join("captured.sql");
        fs::write(&dump, "CREATE TABLE t (id int);\n").unwrap();

        let script = format!("echo 'CREATE TABLE'; cat > '{}'", captured.display());
        let executor = ContainerCommandExecutor::new(&Config::default())
            .with_restore_command("sh", &["-c", &script])
            .with_stdout_to_stderr(true);
        assert!(executor.stdout_to_stderr);

        executor.restore_from_file(&dump).await.unwrap();

        assert_eq!(fs::read_to_string(&captured).unwrap(), "CREATE TABLE t (id int);\n");
    }

    #[tokio::test]
    async fn test_restore_missing_dump() {
        let dir = tempfile::tempdir().unwrap();
        let executor = ContainerCommandExecutor::new(&Config::default())
            .with_restore_command("sh", &["-c", "cat > /dev/null"]);

        let err = executor
            .restore_from_file(&dir.path().join("absent.sql"))
            .await
            .unwrap_err();

        assert!(matches!(err, RestoreServiceError::DumpMissing(_)));
    }

    #[tokio::test]
    async fn test_restore_classifies_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("07-14-17.sql");
        fs::write(&dump, "SELECT 1;\n").unwrap();

        let executor = ContainerCommandExecutor::new(&Config::default()).with_restore_command(
            "sh",
            &["-c", "cat > /dev/null; echo 'Error: No such container: postgres' >&2; exit 1"],
        );
        let err = executor.restore_from_file(&dump).await.unwrap_err();
        assert!(matches!(err, RestoreServiceError::ContainerNotFound(name) if name == "postgres"));

        let executor = ContainerCommandExecutor::new(&Config::default()).with_restore_command(
            "sh",
            &["-c", "cat > /dev/null; echo 'psql: FATAL:  role \"postgres\" does not exist' >&2; exit 2"],
        );
        let err = executor.restore_from_file(&dump).await.unwrap_err();
        assert!(matches!(err, RestoreServiceError::AuthenticationFailed(role) if role == "postgres"));
    }

    #[tokio::test]
    async fn test_restore_silent_failure_reports_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("07-14-17.sql");
        fs::write(&dump, "SELECT 1;\n").unwrap();

        let executor = ContainerCommandExecutor::new(&Config::default())
            .with_restore_command("sh", &["-c", "cat > /dev/null; exit 3"]);
        let err = executor.restore_from_file(&dump).await.unwrap_err();

        assert!(matches!(err, RestoreServiceError::CommandFailed(msg) if msg.contains("Some(3)")));
    }

    #[tokio::test]
    async fn test_missing_runtime_binary() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("07-14-17.sql");
        fs::write(&dump, "SELECT 1;\n").unwrap();

        let executor = ContainerCommandExecutor::new(&Config::default())
            .with_restore_command("definitely-not-a-container-runtime", &[]);
        let err = executor.restore_from_file(&dump).await.unwrap_err();

        assert!(matches!(err, RestoreServiceError::CommandNotFound(_)));
    }
}
