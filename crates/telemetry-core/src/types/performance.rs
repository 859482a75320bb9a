//! Store-computed performance rollups.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Periodic performance rollup persisted by the engine.
///
/// An alternative source of performance figures that viewers display next to
/// their locally derived metrics. The two converge once both observe the same
/// trades but are not expected to agree exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSnapshot {
    pub equity: Decimal,
    pub daily_pnl: Decimal,
    pub win_rate: Decimal,
    pub profit_factor: Decimal,
    pub sharpe_ratio: f64,
    pub max_drawdown: Decimal,
    pub created_at: DateTime<Utc>,
}
