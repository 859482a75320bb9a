//! Trading telemetry CLI application.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::PathBuf;
use telemetry_config::load_config;
use telemetry_monitor::setup_logging;

/// Log file used while the dashboard owns the terminal.
const DASHBOARD_LOG_FILE: &str = "telemetry-watch.log";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config_path();
    let config = load_config(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration from environment".to_string(),
    })?;

    // Setup logging
    let log_level = cli
        .log_level
        .map(|level| level.as_str().to_string())
        .unwrap_or_else(|| config.logging.level.clone());
    let log_file = cli
        .log_file
        .clone()
        .or_else(|| config.logging.file.as_ref().map(PathBuf::from))
        .or_else(|| {
            cli.command
                .owns_terminal()
                .then(|| PathBuf::from(DASHBOARD_LOG_FILE))
        });
    let _log_guard = setup_logging(
        &log_level,
        cli.json_logs || config.logging.is_json(),
        log_file.as_deref(),
    );

    // Execute command
    match cli.command {
        Commands::Serve(args) => cli::commands::serve::run(args, config).await,
        Commands::Watch(args) => cli::commands::watch::run(args, config).await,
        Commands::Report(args) => cli::commands::report::run(args, config).await,
        Commands::ValidateConfig => cli::commands::validate::run(config_path.as_deref(), &config).await,
    }
}
