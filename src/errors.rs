use thiserror::Error;

/// Error enum for the restore tool using thiserror
#[derive(Error, Debug)]
pub enum RestoreServiceError {
    // Download errors
    #[error("Download failed: {url} returned HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Dump file not found: {0}")]
    DumpMissing(String),

    // Container runtime and database client errors
    #[error("Container not found or not running: {0}")]
    ContainerNotFound(String),

    #[error("Container runtime unavailable: Cannot connect to the Docker daemon")]
    DaemonUnavailable,

    #[error("Permission denied while talking to the container runtime")]
    PermissionDenied,

    #[error("Database authentication failed for role: {0}")]
    AuthenticationFailed(String),

    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("Command not found or execution error: {0}")]
    CommandNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("{step} step failed: {reason}")]
    StepFailed { step: String, reason: String },

    // Automatic conversions from standard library errors
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    DialogueError(#[from] dialoguer::Error),

    #[error(transparent)]
    TemplateError(#[from] indicatif::style::TemplateError),
}

impl RestoreServiceError {
    /// Parse docker/psql stderr output to determine specific error type
    pub fn from_stderr(stderr: &str, context: &str) -> Self {
        let stderr_lower = stderr.to_lowercase();

        if stderr_lower.contains("cannot connect to the docker daemon")
            || stderr_lower.contains("is the docker daemon running")
        {
            RestoreServiceError::DaemonUnavailable
        } else if stderr_lower.contains("no such container")
            || stderr_lower.contains("no such object")
            || stderr_lower.contains("is not running")
        {
            RestoreServiceError::ContainerNotFound(context.to_string())
        } else if stderr_lower.contains("permission denied") {
            RestoreServiceError::PermissionDenied
        } else if stderr_lower.contains("authentication failed")
            || (stderr_lower.contains("role") && stderr_lower.contains("does not exist"))
        {
            RestoreServiceError::AuthenticationFailed(context.to_string())
        } else {
            RestoreServiceError::CommandFailed(stderr.trim().to_string())
        }
    }
}
