//! Validate configuration command.

use anyhow::Result;
use std::path::Path;
use telemetry_config::AppConfig;
use telemetry_core::types::EntityKind;

pub async fn run(config_path: Option<&Path>, config: &AppConfig) -> Result<()> {
    match config_path {
        Some(path) => println!("Validating configuration: {:?}", path),
        None => println!("Validating configuration: defaults and environment"),
    }

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Err(e.into());
    }

    println!("Configuration is valid!");
    println!();
    println!("App: {}", config.app.name);
    println!("Environment: {}", config.app.environment);
    println!("Log level: {}", config.logging.level);
    println!("Store: {}", config.store.url);
    println!("Server bind: {}", config.server.bind);
    println!("Max sessions: {}", config.server.max_sessions);
    for kind in EntityKind::ALL {
        match config.server.cadence.period(kind) {
            Some(period) => println!("  {:<14} every {} ms", kind.to_string(), period.as_millis()),
            None => println!("  {:<14} on connect and on request only", kind.to_string()),
        }
    }
    println!("Trades per push: {}", config.server.trades_limit);
    println!(
        "Signals per push: {} ({})",
        config.server.signals_limit,
        if config.server.signals_pending_only {
            "pending only"
        } else {
            "all statuses"
        }
    );
    println!("Client URL: {}", config.client.url);
    println!("Reconnect: {:?}", config.client.reconnect);
    println!("Starting capital: ${}", config.metrics.starting_capital);
    println!();
    println!("Effective configuration:");
    println!("{}", config.to_toml()?);

    Ok(())
}
