use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};

mod config;
mod errors;
mod fetch;
mod shared;
mod utils;

use crate::config::Config;
use crate::errors::RestoreServiceError;
use crate::shared::commands::ContainerCommandExecutor;
use crate::shared::constants::{LOG_DIR, LOG_FILE_PREFIX};
use crate::shared::restore_workflow::RestoreWorkflow;

#[derive(Parser)]
#[command(name = "moneybot-db-restore")]
#[command(about = "Download a moneybot database release and restore it into a dockerized postgres", long_about = None)]
struct Cli {
    /// Defaults to `run` with configured values
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the release dump, restore it, and remove the download
    Run(RunArgs),
    /// Print the download URL and local dump path
    Url {
        /// Release identifier (default: MONEYBOT_RELEASE or 07-14-17)
        #[arg(short, long)]
        release: Option<String>,
    },
    /// Check that the container runtime is reachable and the container is running
    Check {
        #[arg(short, long)]
        container: Option<String>,
    },
    /// Generate sample .env file
    Init {
        /// Overwrite an existing .env without asking
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args, Default)]
struct RunArgs {
    /// Release identifier (default: MONEYBOT_RELEASE or 07-14-17)
    #[arg(short, long)]
    release: Option<String>,
    /// Name of the running postgres container
    #[arg(short, long)]
    container: Option<String>,
    /// Database superuser role
    #[arg(short, long)]
    user: Option<String>,
    /// Stop after the first failed step (cleanup still runs) and exit non-zero
    #[arg(long)]
    strict: bool,
    /// Print the workflow report as JSON
    #[arg(short, long)]
    json: bool,
}

/// Log to stdout plus a daily file. With `json_output` stdout is reserved
/// for the report, so console logs go to stderr.
fn init_logging(
    json_output: bool,
) -> Result<tracing_appender::non_blocking::WorkerGuard, RestoreServiceError> {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt::writer::MakeWriterExt, EnvFilter};

    // Create logs directory if it doesn't exist
    std::fs::create_dir_all(LOG_DIR)?;

    let file_appender = rolling::daily(LOG_DIR, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
    if json_output {
        builder.with_writer(std::io::stderr.and(non_blocking)).init();
    } else {
        builder.with_writer(std::io::stdout.and(non_blocking)).init();
    }

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let json_output = matches!(&cli.command, Some(Commands::Run(RunArgs { json: true, .. })));

    // Initialize logging before any work; the guard flushes the log file on exit
    let _guard = init_logging(json_output)?;

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => {
            let config = Config::load().with_overrides(args.release, args.container, args.user)?;
            run_restore(config, args.strict, args.json).await?;
        }
        Commands::Url { release } => {
            let config = Config::load().with_overrides(release, None, None)?;
            println!("{}", config.download_url());
            println!("{}", config.dump_path().display());
        }
        Commands::Check { container } => {
            let config = Config::load().with_overrides(None, container, None)?;
            check_container(&config).await?;
        }
        Commands::Init { force } => {
            init_env_file(force)?;
        }
    }

    Ok(())
}

async fn run_restore(config: Config, strict: bool, json: bool) -> Result<(), RestoreServiceError> {
    let workflow = RestoreWorkflow::new(config, strict, json)?;
    let report = workflow.execute().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    report.exit_result()
}

async fn check_container(config: &Config) -> Result<(), RestoreServiceError> {
    let executor = ContainerCommandExecutor::new(config);

    if executor.container_running().await? {
        info!(container = %config.container, "Container is running");
        Ok(())
    } else {
        error!(container = %config.container, "Container is not running");
        Err(RestoreServiceError::ContainerNotFound(config.container.clone()))
    }
}

fn init_env_file(force: bool) -> Result<(), RestoreServiceError> {
    use crate::shared::ui::confirm_action;
    use std::fs;
    use std::path::Path;

    let env_file = ".env";
    if Path::new(env_file).exists()
        && !force
        && !confirm_action(".env file already exists, overwrite it?", false)?
    {
        warn!(file = %env_file, ".env file already exists, not overwriting");
        return Ok(());
    }

    let content = r#"# moneybot database restore configuration
# Every value is optional; defaults are shown

# Release to download and restore
MONEYBOT_RELEASE=07-14-17

# Where releases are published
MONEYBOT_RELEASE_BASE_URL=https://github.com/elsehow/moneybot/releases/download

# Running postgres container and superuser role
MONEYBOT_PG_CONTAINER=postgres
MONEYBOT_PG_USER=postgres

# Container runtime binary
MONEYBOT_DOCKER_BIN=docker

# Directory the dump is downloaded to
MONEYBOT_WORK_DIR=.
"#;

    fs::write(env_file, content)?;
    info!(file = %env_file, "Created sample .env file");

    Ok(())
}
