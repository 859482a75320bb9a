//! Report command implementation.

use anyhow::{Context, Result};
use telemetry_config::AppConfig;
use telemetry_metrics::MetricsReport;
use telemetry_store::open_store;
use tracing::info;

use crate::cli::{OutputFormat, ReportArgs};

pub async fn run(args: ReportArgs, mut config: AppConfig) -> Result<()> {
    if let Some(store) = args.store {
        config.store.url = store;
    }
    if let Some(capital) = args.capital {
        config.metrics.starting_capital = capital;
    }
    config.validate()?;

    let store = open_store(&config.store.url)
        .with_context(|| format!("Failed to open store '{}'", config.store.url))?;

    let trades = store
        .recent_trades(args.limit)
        .await
        .context("Failed to read trades")?;
    let positions = store
        .open_positions()
        .await
        .context("Failed to read positions")?;
    let rollup = store
        .latest_performance()
        .await
        .context("Failed to read performance rollup")?;
    info!(
        store = store.name(),
        trades = trades.len(),
        positions = positions.len(),
        "Loaded store rows"
    );

    let report = MetricsReport::build(&config.metrics, &positions, &trades, rollup);

    // Output results
    match args.output {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => println!("{}", report.summary()),
    }

    // Save if requested
    if let Some(path) = &args.save {
        std::fs::write(path, report.to_json()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Report saved to {:?}", path);
    }
    if let Some(path) = &args.equity_csv {
        std::fs::write(path, report.equity_to_csv())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Equity curve saved to {:?}", path);
    }

    Ok(())
}
