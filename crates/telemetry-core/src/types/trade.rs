//! Trade records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Get the sign for P&L calculations (+1 for long, -1 for short).
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Long => Decimal::ONE,
            Side::Short => -Decimal::ONE,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// Trade lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    Open,
    Closed,
}

/// A single trade as persisted by the execution engine.
///
/// `exit_price`, `pnl` and `exit_time` are only present once the trade is
/// closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub entry_price: Decimal,
    #[serde(default)]
    pub exit_price: Option<Decimal>,
    pub size: Decimal,
    #[serde(default)]
    pub pnl: Option<Decimal>,
    pub fees: Decimal,
    pub status: TradeStatus,
    pub entry_time: DateTime<Utc>,
    #[serde(default)]
    pub exit_time: Option<DateTime<Utc>>,
}

impl Trade {
    /// Create a new open trade.
    pub fn open(
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
            exit_price: None,
            size,
            pnl: None,
            fees: Decimal::ZERO,
            status: TradeStatus::Open,
            entry_time,
            exit_time: None,
        }
    }

    /// Set the fees paid on this trade.
    pub fn with_fees(mut self, fees: Decimal) -> Self {
        self.fees = fees;
        self
    }

    /// Close the trade at a price, realizing P&L net of fees.
    pub fn close(mut self, exit_price: Decimal, exit_time: DateTime<Utc>) -> Self {
        let gross = exit_price
            .saturating_sub(self.entry_price)
            .saturating_mul(self.size)
            .saturating_mul(self.side.sign());
        self.exit_price = Some(exit_price);
        self.pnl = Some(gross.saturating_sub(self.fees));
        self.exit_time = Some(exit_time);
        self.status = TradeStatus::Closed;
        self
    }

    /// Check if the trade has been closed.
    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }

    /// Realized P&L, zero when the store has not recorded one.
    pub fn realized_pnl(&self) -> Decimal {
        self.pnl.unwrap_or(Decimal::ZERO)
    }

    /// Holding time of a closed trade.
    pub fn holding_time(&self) -> Option<chrono::Duration> {
        self.exit_time.map(|exit| exit - self.entry_time)
    }
}
