//! Open position records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Side;

/// A single currently-open exposure.
///
/// The store keeps one row per open position and no history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub entry_price: Decimal,
    pub current_price: Decimal,
    pub size: Decimal,
    /// Unrealized profit/loss as computed upstream
    pub unrealized_pnl: Decimal,
    /// Unrealized P&L as a percentage of the entry notional
    pub unrealized_pnl_pct: Decimal,
    #[serde(default)]
    pub take_profit: Option<Decimal>,
    #[serde(default)]
    pub stop_loss: Option<Decimal>,
    pub entry_time: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    /// Create a new position marked at its entry price.
    pub fn new(
        id: impl Into<String>,
        symbol: impl Into<String>,
        side: Side,
        entry_price: Decimal,
        size: Decimal,
        entry_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            side,
            entry_price,
            current_price: entry_price,
            size,
            unrealized_pnl: Decimal::ZERO,
            unrealized_pnl_pct: Decimal::ZERO,
            take_profit: None,
            stop_loss: None,
            entry_time,
            updated_at: entry_time,
        }
    }

    /// Check if this is a long position.
    pub fn is_long(&self) -> bool {
        self.side == Side::Long
    }

    /// Absolute market value of the position, saturating at `Decimal::MAX`.
    pub fn notional(&self) -> Decimal {
        self.size.saturating_mul(self.current_price).abs()
    }

    /// Update the current market price and recalculate unrealized values.
    pub fn update_price(&mut self, price: Decimal, at: DateTime<Utc>) {
        self.current_price = price;
        self.unrealized_pnl = price
            .saturating_sub(self.entry_price)
            .saturating_mul(self.size)
            .saturating_mul(self.side.sign());

        let cost_basis = self.entry_price.saturating_mul(self.size).abs();
        self.unrealized_pnl_pct = self
            .unrealized_pnl
            .checked_div(cost_basis)
            .map(|r| r.saturating_mul(Decimal::from(100)))
            .unwrap_or(Decimal::ZERO);
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_short_position_mark() {
        let opened = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let mut position = Position::new("p1", "ETHUSDT", Side::Short, dec!(200), dec!(5), opened);
        assert!(!position.is_long());

        position.update_price(dec!(190), opened + chrono::Duration::minutes(5));
        assert_eq!(position.unrealized_pnl, dec!(50));
        assert_eq!(position.unrealized_pnl_pct, dec!(5));
        assert_eq!(position.notional(), dec!(950));
    }

    #[test]
    fn test_notional_uses_absolute_value() {
        let opened = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let position = Position::new("p2", "BTCUSDT", Side::Short, dec!(100), dec!(-3), opened);
        assert_eq!(position.notional(), dec!(300));
    }

    #[test]
    fn test_notional_saturates() {
        let opened = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let huge = Decimal::from(1_000_000_000_000_000_i64);
        let position = Position::new("p3", "BTCUSDT", Side::Long, huge, huge, opened);
        assert_eq!(position.notional(), Decimal::MAX);
    }
}
