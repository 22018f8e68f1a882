//! Playwatch - live viewer for remotely executed playbook runs.
//!
//! Main entry point for the Playwatch CLI.

mod cli;
mod cmd_click;
mod cmd_watch;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use playwatch_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};

use cli::{Cli, Commands};

/// Get the Playwatch home directory (~/.playwatch).
fn playwatch_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".playwatch"))
        .unwrap_or_else(|| PathBuf::from(".playwatch"))
}

/// Resolve the config file: explicit path, then ./playwatch.toml, then ~/.playwatch/config.toml.
fn config_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    let local = PathBuf::from("playwatch.toml");
    if local.exists() {
        return local;
    }
    playwatch_dir().join("config.toml")
}

/// Initialize tracing with console and file output.
///
/// Log files go to the configured directory with daily rotation.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let log_dir = PathBuf::from(ConfigLoader::expand_path(&logging.directory));
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("playwatch")
        .filename_suffix("log")
        .max_log_files(14)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the writer alive for the whole program.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = ConfigLoader::load_or_default(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let path = config_path(cli.config);
    let config = load_config(&path)?;

    init_tracing(&config.logging)?;
    info!("Playwatch v{} (config: {})", env!("CARGO_PKG_VERSION"), path.display());

    let warnings = ConfigValidator::validate(&config).into_result()?;
    for warning in warnings {
        warn!("Config {}: {}", warning.path, warning.message);
    }

    match cli.command {
        Commands::Watch {
            execution_ids,
            save_frames,
        } => cmd_watch::run(&config, execution_ids, save_frames).await,
        Commands::Click {
            execution_id,
            at,
            rendered,
            native,
        } => cmd_click::click(&config, &execution_id, at, rendered, native).await,
        Commands::Map {
            at,
            rendered,
            native,
        } => {
            let point = cmd_click::map(at, rendered, native)?;
            println!("{} {}", point.x, point.y);
            Ok(())
        }
    }
}
