//! Equity walk over realized trades.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use telemetry_core::types::Trade;

use crate::{percent, ratio};

/// One point of the equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: Decimal,
}

/// Cumulative equity with peak-tracking drawdown.
///
/// Starts at the configured capital and adds one realized P&L per step.
#[derive(Debug, Clone)]
pub struct EquityWalk {
    starting_capital: Decimal,
    points: Vec<EquityPoint>,
    peak: Decimal,
    max_drawdown_pct: Decimal,
    current_drawdown_pct: Decimal,
}

impl EquityWalk {
    /// Create an empty walk.
    pub fn new(starting_capital: Decimal) -> Self {
        Self {
            starting_capital,
            points: Vec::new(),
            peak: starting_capital,
            max_drawdown_pct: Decimal::ZERO,
            current_drawdown_pct: Decimal::ZERO,
        }
    }

    /// Walk the closed trades in exit-time order.
    ///
    /// Open trades and closed trades without an exit time are skipped. Ties
    /// on exit time keep their input order.
    pub fn from_trades(trades: &[Trade], starting_capital: Decimal) -> Self {
        let mut realized: Vec<(DateTime<Utc>, Decimal)> = trades
            .iter()
            .filter(|t| t.is_closed())
            .filter_map(|t| t.exit_time.map(|exit| (exit, t.realized_pnl())))
            .collect();
        realized.sort_by_key(|(exit, _)| *exit);

        let mut walk = Self::new(starting_capital);
        for (exit, pnl) in realized {
            walk.record(exit, pnl);
        }
        walk
    }

    /// Apply one realized P&L. Equity saturates at the `Decimal` bounds.
    pub fn record(&mut self, timestamp: DateTime<Utc>, pnl: Decimal) {
        let equity = self.equity().saturating_add(pnl);
        self.points.push(EquityPoint { timestamp, equity });

        if equity > self.peak {
            self.peak = equity;
        }

        self.current_drawdown_pct = if self.peak > Decimal::ZERO {
            percent(self.peak.saturating_sub(equity), self.peak)
        } else {
            Decimal::ZERO
        };

        if self.current_drawdown_pct > self.max_drawdown_pct {
            self.max_drawdown_pct = self.current_drawdown_pct;
        }
    }

    /// Current equity.
    pub fn equity(&self) -> Decimal {
        self.points
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.starting_capital)
    }

    pub fn starting_capital(&self) -> Decimal {
        self.starting_capital
    }

    pub fn peak(&self) -> Decimal {
        self.peak
    }

    /// Largest peak-to-trough decline seen, in percent.
    pub fn max_drawdown_pct(&self) -> Decimal {
        self.max_drawdown_pct
    }

    /// Decline of the latest equity from the peak, in percent.
    pub fn current_drawdown_pct(&self) -> Decimal {
        self.current_drawdown_pct
    }

    pub fn points(&self) -> &[EquityPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<EquityPoint> {
        self.points
    }

    /// Per-step simple returns, the first measured against the starting capital.
    pub fn returns(&self) -> Vec<f64> {
        let mut prev = self.starting_capital;
        let mut returns = Vec::with_capacity(self.points.len());

        for point in &self.points {
            if prev > Decimal::ZERO {
                let ret = ratio(point.equity.saturating_sub(prev), prev)
                    .to_f64()
                    .unwrap_or(0.0);
                returns.push(ret);
            }
            prev = point.equity;
        }

        returns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn ts(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0).unwrap()
    }

    #[test]
    fn test_peak_tracking() {
        let mut walk = EquityWalk::new(dec!(1000));
        walk.record(ts(1), dec!(100));
        walk.record(ts(2), dec!(-220));
        walk.record(ts(3), dec!(50));

        assert_eq!(walk.equity(), dec!(930));
        assert_eq!(walk.peak(), dec!(1100));
        assert_eq!(walk.max_drawdown_pct(), dec!(20));
        assert!(walk.current_drawdown_pct() < walk.max_drawdown_pct());
    }

    #[test]
    fn test_non_positive_peak_reports_zero_drawdown() {
        let mut walk = EquityWalk::new(Decimal::ZERO);
        walk.record(ts(1), dec!(-10));

        assert_eq!(walk.max_drawdown_pct(), Decimal::ZERO);
        assert_eq!(walk.equity(), dec!(-10));
    }

    #[test]
    fn test_returns_against_previous_equity() {
        let mut walk = EquityWalk::new(dec!(100));
        walk.record(ts(1), dec!(10));
        walk.record(ts(2), dec!(-11));

        let returns = walk.returns();
        assert_eq!(returns.len(), 2);
        assert!((returns[0] - 0.10).abs() < 1e-12);
        assert!((returns[1] + 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_equity_saturates_instead_of_overflowing() {
        let mut walk = EquityWalk::new(dec!(10000));
        walk.record(ts(1), Decimal::MAX);
        assert_eq!(walk.equity(), Decimal::MAX);
        assert_eq!(walk.peak(), Decimal::MAX);

        walk.record(ts(2), Decimal::MIN);
        assert_eq!(walk.equity(), Decimal::ZERO);
        assert_eq!(walk.max_drawdown_pct(), dec!(100));
        assert_eq!(walk.returns().len(), 2);
    }
}
