//! Engine health records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Execution mode of the trading engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradingMode {
    Paper,
    Live,
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingMode::Paper => write!(f, "PAPER"),
            TradingMode::Live => write!(f, "LIVE"),
        }
    }
}

/// Engine activity counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineCounters {
    pub ticks_processed: u64,
    pub signals_generated: u64,
    pub trades_executed: u64,
}

/// Singleton engine status row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub is_active: bool,
    pub mode: TradingMode,
    pub last_heartbeat: DateTime<Utc>,
    pub counters: EngineCounters,
    pub updated_at: DateTime<Utc>,
}

impl SystemStatus {
    /// Check whether the last heartbeat is older than `max_age`.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.last_heartbeat > max_age
    }
}
