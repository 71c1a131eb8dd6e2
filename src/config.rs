use crate::errors::RestoreServiceError;
use crate::shared::constants::{
    DEFAULT_DOCKER_BIN, DEFAULT_PG_CONTAINER, DEFAULT_PG_USER, DEFAULT_RELEASE,
    DEFAULT_RELEASE_BASE_URL, DUMP_EXTENSION, ENV_DOCKER_BIN, ENV_PG_CONTAINER, ENV_PG_USER,
    ENV_RELEASE, ENV_RELEASE_BASE_URL, ENV_WORK_DIR, RELEASE_DATE_FORMAT,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub release: String,
    pub release_base_url: String,
    pub container: String,
    pub db_user: String,
    pub docker_bin: String,
    pub work_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            release: DEFAULT_RELEASE.to_string(),
            release_base_url: DEFAULT_RELEASE_BASE_URL.to_string(),
            container: DEFAULT_PG_CONTAINER.to_string(),
            db_user: DEFAULT_PG_USER.to_string(),
            docker_bin: DEFAULT_DOCKER_BIN.to_string(),
            work_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load values from `.env` and the environment. Validation happens in
    /// `with_overrides`, once command line flags have been applied.
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup; unset or blank keys fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Config {
            release: value(ENV_RELEASE, DEFAULT_RELEASE),
            release_base_url: value(ENV_RELEASE_BASE_URL, DEFAULT_RELEASE_BASE_URL),
            container: value(ENV_PG_CONTAINER, DEFAULT_PG_CONTAINER),
            db_user: value(ENV_PG_USER, DEFAULT_PG_USER),
            docker_bin: value(ENV_DOCKER_BIN, DEFAULT_DOCKER_BIN),
            work_dir: PathBuf::from(value(ENV_WORK_DIR, ".")),
        }
    }

    /// Apply command line overrides on top of the loaded values, then validate
    pub fn with_overrides(
        mut self,
        release: Option<String>,
        container: Option<String>,
        db_user: Option<String>,
    ) -> Result<Self, RestoreServiceError> {
        if let Some(release) = release {
            self.release = release;
        }
        if let Some(container) = container {
            self.container = container;
        }
        if let Some(db_user) = db_user {
            self.db_user = db_user;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), RestoreServiceError> {
        let release = self.release.as_str();
        if release.is_empty()
            || release == "."
            || release == ".."
            || release.contains(['/', '\\'])
            || release.chars().any(char::is_whitespace)
        {
            return Err(RestoreServiceError::ConfigurationError(format!(
                "Invalid release identifier: {:?}",
                self.release
            )));
        }

        if self.container.is_empty() || self.db_user.is_empty() {
            return Err(RestoreServiceError::ConfigurationError(
                "Container name and database user must not be empty".to_string(),
            ));
        }

        if NaiveDate::parse_from_str(release, RELEASE_DATE_FORMAT).is_err() {
            warn!(release = %release, "Release identifier is not an MM-DD-YY date, using it verbatim");
        }

        Ok(())
    }

    /// Name of the dump file published with the release
    pub fn dump_file_name(&self) -> String {
        format!("{}.{}", self.release, DUMP_EXTENSION)
    }

    /// Get the full download URL for the configured release
    pub fn download_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.release_base_url.trim_end_matches('/'),
            self.release,
            self.dump_file_name()
        )
    }

    /// Local path the dump is written to
    pub fn dump_path(&self) -> PathBuf {
        self.work_dir.join(self.dump_file_name())
    }
}
