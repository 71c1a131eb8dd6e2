// Shared constants used across the restore tool

/// Release published with the moneybot database snapshot
pub const DEFAULT_RELEASE: &str = "07-14-17";
pub const RELEASE_DATE_FORMAT: &str = "%m-%d-%y";

/// Release download location
pub const DEFAULT_RELEASE_BASE_URL: &str = "https://github.com/elsehow/moneybot/releases/download";
pub const DUMP_EXTENSION: &str = "sql";

/// Container and database client
pub const DEFAULT_DOCKER_BIN: &str = "docker";
pub const DEFAULT_PG_CONTAINER: &str = "postgres";
pub const DEFAULT_PG_USER: &str = "postgres";
pub const PSQL_BIN: &str = "psql";

/// Environment variable names
pub const ENV_RELEASE: &str = "MONEYBOT_RELEASE";
pub const ENV_RELEASE_BASE_URL: &str = "MONEYBOT_RELEASE_BASE_URL";
pub const ENV_PG_CONTAINER: &str = "MONEYBOT_PG_CONTAINER";
pub const ENV_PG_USER: &str = "MONEYBOT_PG_USER";
pub const ENV_DOCKER_BIN: &str = "MONEYBOT_DOCKER_BIN";
pub const ENV_WORK_DIR: &str = "MONEYBOT_WORK_DIR";

/// Logging
pub const LOG_DIR: &str = "./logs";
pub const LOG_FILE_PREFIX: &str = "moneybot-restore.log";
