//! CSV directory store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use telemetry_core::error::StoreError;
use telemetry_core::traits::StoreReader;
use telemetry_core::types::{
    EngineCounters, PerformanceSnapshot, Position, Signal, SystemStatus, Trade, TradingMode,
};
use tracing::debug;

use crate::query;

const TRADES_FILE: &str = "trades.csv";
const POSITIONS_FILE: &str = "positions.csv";
const SIGNALS_FILE: &str = "signals.csv";
const SYSTEM_STATUS_FILE: &str = "system_status.csv";
const PERFORMANCE_FILE: &str = "performance.csv";

/// Flat CSV form of [`SystemStatus`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SystemStatusRecord {
    is_active: bool,
    mode: TradingMode,
    last_heartbeat: DateTime<Utc>,
    #[serde(default)]
    ticks_processed: u64,
    #[serde(default)]
    signals_generated: u64,
    #[serde(default)]
    trades_executed: u64,
    updated_at: DateTime<Utc>,
}

impl From<SystemStatusRecord> for SystemStatus {
    fn from(record: SystemStatusRecord) -> Self {
        Self {
            is_active: record.is_active,
            mode: record.mode,
            last_heartbeat: record.last_heartbeat,
            counters: EngineCounters {
                ticks_processed: record.ticks_processed,
                signals_generated: record.signals_generated,
                trades_executed: record.trades_executed,
            },
            updated_at: record.updated_at,
        }
    }
}

/// Store backed by a directory of CSV exports, one file per record kind.
///
/// Files are re-read on every fetch, so external writers only need to
/// replace them. A missing file reads as no rows.
pub struct CsvStore {
    dir: PathBuf,
    name: String,
}

impl CsvStore {
    /// Create a new CSV store over an existing directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        let name = format!("csv:{}", dir.display());
        Ok(Self { dir, name })
    }

    /// Directory the store reads from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load every row of one file on the blocking pool.
    async fn load<T>(&self, file: &'static str) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || load_file(&dir, file))
            .await
            .map_err(|e| StoreError::Unavailable(format!("reader task failed: {}", e)))?
    }
}

fn load_file<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<Vec<T>, StoreError> {
    if !dir.is_dir() {
        return Err(StoreError::Unavailable(format!(
            "{} is not reachable",
            dir.display()
        )));
    }

    let path = dir.join(file);
    if !path.exists() {
        debug!(file, "CSV file missing, reading as empty");
        return Ok(Vec::new());
    }

    let parse_error = |message: String| StoreError::Parse {
        source_name: file.to_string(),
        message,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_path(&path)
        .map_err(|e| parse_error(e.to_string()))?;

    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let row: T = result.map_err(|e| parse_error(e.to_string()))?;
        rows.push(row);
    }

    Ok(rows)
}

#[async_trait]
impl StoreReader for CsvStore {
    async fn system_status(&self) -> Result<Option<SystemStatus>, StoreError> {
        let records: Vec<SystemStatusRecord> = self.load(SYSTEM_STATUS_FILE).await?;
        Ok(records
            .into_iter()
            .max_by_key(|r| r.updated_at)
            .map(SystemStatus::from))
    }

    async fn recent_trades(&self, limit: usize) -> Result<Vec<Trade>, StoreError> {
        let trades = self.load(TRADES_FILE).await?;
        Ok(query::recent_trades(trades, limit))
    }

    async fn open_positions(&self) -> Result<Vec<Position>, StoreError> {
        let positions = self.load(POSITIONS_FILE).await?;
        Ok(query::open_positions(positions))
    }

    async fn recent_signals(
        &self,
        limit: usize,
        pending_only: bool,
    ) -> Result<Vec<Signal>, StoreError> {
        let signals = self.load(SIGNALS_FILE).await?;
        Ok(query::recent_signals(signals, limit, pending_only))
    }

    async fn latest_performance(&self) -> Result<Option<PerformanceSnapshot>, StoreError> {
        let rows = self.load(PERFORMANCE_FILE).await?;
        Ok(query::latest_performance(rows))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
