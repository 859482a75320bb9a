//! Serve command implementation.

use anyhow::{Context, Result};
use telemetry_config::AppConfig;
use telemetry_server::TelemetryServer;
use telemetry_store::open_store;
use tracing::{info, warn};

use crate::cli::ServeArgs;

pub async fn run(args: ServeArgs, mut config: AppConfig) -> Result<()> {
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(store) = args.store {
        config.store.url = store;
    }
    config.validate()?;

    let store = open_store(&config.store.url)
        .with_context(|| format!("Failed to open store '{}'", config.store.url))?;

    let server = TelemetryServer::new(config.server.clone(), store);
    let listener = server
        .bind()
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, shutting down");
                let _ = shutdown.send(());
            }
            Err(e) => warn!(error = %e, "Failed to listen for interrupt"),
        }
    });

    server.serve(listener).await?;

    let stats = server.stats().snapshot();
    info!(
        connections = stats.connections_accepted,
        rejected = stats.connections_rejected,
        pushes = stats.pushes_sent,
        fetch_failures = stats.fetch_failures,
        refresh_requests = stats.refresh_requests,
        refreshes_coalesced = stats.refreshes_coalesced,
        "Server statistics"
    );
    Ok(())
}
