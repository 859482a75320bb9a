//! Trading signal records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Side;

/// Signal lifecycle status.
///
/// Signals are created `Pending` and move to exactly one terminal state.
/// Transitions happen outside this system; only the current value is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStatus {
    Pending,
    Executed,
    Rejected,
    Expired,
}

impl SignalStatus {
    /// Check if the signal has left the pending state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SignalStatus::Pending)
    }
}

/// A trading signal emitted by a strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    /// Confidence in [0, 1]
    pub confidence: f64,
    pub price: Decimal,
    #[serde(default)]
    pub reason: Option<String>,
    pub status: SignalStatus,
    pub created_at: DateTime<Utc>,
}

impl Signal {
    pub fn is_pending(&self) -> bool {
        self.status == SignalStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!SignalStatus::Pending.is_terminal());
        assert!(SignalStatus::Executed.is_terminal());
        assert!(SignalStatus::Rejected.is_terminal());
        assert!(SignalStatus::Expired.is_terminal());
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&SignalStatus::Expired).unwrap();
        assert_eq!(json, "\"EXPIRED\"");
    }
}
