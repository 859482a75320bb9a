//! Watch command implementation.

use anyhow::Result;
use std::cell::RefCell;
use std::time::Duration;
use telemetry_client::{Mirror, SyncAgent, SyncHandle};
use telemetry_config::AppConfig;
use telemetry_monitor::{Dashboard, DashboardState};
use tracing::info;

use crate::cli::WatchArgs;

/// Log lines kept for the dashboard.
const MAX_MESSAGES: usize = 50;

pub async fn run(args: WatchArgs, mut config: AppConfig) -> Result<()> {
    if let Some(url) = args.url {
        config.client.url = url;
    }
    config.validate()?;

    info!(url = %config.client.url, reconnect = ?config.client.reconnect, "Starting sync agent");
    let handle = SyncAgent::spawn(config.client.clone(), &config.metrics);

    let result = if args.headless {
        run_headless(&handle, Duration::from_secs(args.interval.max(1))).await;
        Ok(())
    } else {
        let dashboard = Dashboard::new(args.refresh_ms);
        let url = config.client.url.clone();
        tokio::task::block_in_place(|| run_dashboard(&dashboard, &handle, url))
    };

    handle.shutdown().await;
    result
}

fn run_dashboard(dashboard: &Dashboard, handle: &SyncHandle, server_url: String) -> Result<()> {
    let messages = RefCell::new(Vec::new());
    let mut was_connected = false;

    dashboard.run(
        || {
            let mirror = handle.mirror();
            if mirror.is_connected() != was_connected {
                was_connected = mirror.is_connected();
                let line = if was_connected {
                    format!("Connected to {server_url}")
                } else {
                    "Connection lost, showing last known data".to_string()
                };
                push_message(&messages, line);
            }
            DashboardState {
                mirror,
                server_url: server_url.clone(),
                messages: messages.borrow().clone(),
            }
        },
        || {
            if handle.is_connected() {
                handle.refresh_all();
                push_message(&messages, "Refresh requested".to_string());
            } else {
                push_message(&messages, "Not connected, refresh skipped".to_string());
            }
        },
    )?;
    Ok(())
}

fn push_message(messages: &RefCell<Vec<String>>, line: String) {
    let mut messages = messages.borrow_mut();
    messages.push(format!("{} {}", chrono::Local::now().format("%H:%M:%S"), line));
    if messages.len() > MAX_MESSAGES {
        let excess = messages.len() - MAX_MESSAGES;
        messages.drain(..excess);
    }
}

async fn run_headless(handle: &SyncHandle, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => log_summary(&handle.mirror()),
            _ = &mut ctrl_c => {
                info!("Interrupt received, stopping");
                break;
            }
        }
    }
}

fn log_summary(mirror: &Mirror) {
    let risk = mirror.risk();
    let perf = mirror.performance_metrics();
    info!(
        connected = mirror.is_connected(),
        trades = mirror.trades().len(),
        positions = mirror.positions().len(),
        signals = mirror.signals().len(),
        exposure = %risk.total_exposure,
        risk_level = %risk.risk_level,
        max_drawdown_pct = %risk.max_drawdown_pct.round_dp(2),
        win_rate_pct = %perf.win_rate_pct.round_dp(2),
        profit_factor = %perf.profit_factor,
        "Mirror summary"
    );
}
