//! RouteKit - capability-indexed service router
//!
//! Main entry point for the RouteKit CLI.

mod cli;
mod cmd_route;
mod demo;
mod register;

use clap::Parser;
use tracing::{debug, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use routekit_config::{ConfigLoader, ConfigValidator, LoggingConfig};

use cli::{Cli, Commands};

/// Initialize tracing with console output and an optional daily rolling log file.
fn init_tracing(
    logging: &LoggingConfig,
    level_override: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let level = level_override.unwrap_or(&logging.level);
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let console = if logging.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_ansi(true)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let file = match logging.directory_path() {
        Some(log_dir) => {
            std::fs::create_dir_all(&log_dir)?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(logging.file_prefix.as_str())
                .max_log_files(30)
                .build(&log_dir)?;

            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // The worker guard must outlive the subscriber.
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (config, source) = ConfigLoader::discover(cli.config.as_deref())?;
    let validation = ConfigValidator::validate(&config)?;

    init_tracing(&config.logging, cli.log_level.as_deref())?;

    match &source {
        Some(path) => debug!(path = %path.display(), "Loaded configuration"),
        None => debug!("No configuration file found, using defaults"),
    }
    for warning in &validation.warnings {
        warn!(path = %warning.path, "{}", warning.message);
    }
    validation.into_result()?;

    match cli.command {
        Commands::Check => cmd_route::check(&config)?,
        Commands::List { format } => cmd_route::list(&config, &format)?,
        Commands::Perform {
            service,
            user,
            remove,
        } => cmd_route::perform(&config, service, &user, remove).await?,
    }
    Ok(())
}
