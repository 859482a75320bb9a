//! Risk calculator.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use telemetry_core::types::{Position, Trade};

use crate::{EquityWalk, MetricsConfig};

/// Risk tier derived from maximum drawdown.
///
/// Thresholds are exclusive lower bounds: a drawdown of exactly 10, 15 or 20
/// percent maps to the lower tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Classify a maximum drawdown percentage.
    pub fn from_drawdown(max_drawdown_pct: Decimal) -> Self {
        if max_drawdown_pct > dec!(20) {
            RiskLevel::Critical
        } else if max_drawdown_pct > dec!(15) {
            RiskLevel::High
        } else if max_drawdown_pct > dec!(10) {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Live risk figures.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Sum of absolute position notionals
    pub total_exposure: Decimal,
    /// Sum of upstream unrealized P&L
    pub unrealized_pnl: Decimal,
    /// Sum of closed-trade P&L
    pub realized_pnl: Decimal,
    /// Maximum drawdown over the realized equity curve, in percent
    pub max_drawdown_pct: Decimal,
    /// Drawdown after the most recent closed trade, in percent
    pub current_drawdown_pct: Decimal,
    pub risk_level: RiskLevel,
    pub open_positions: usize,
}

/// Computes [`RiskMetrics`] from positions and trades.
#[derive(Debug, Clone)]
pub struct RiskCalculator {
    starting_capital: Decimal,
}

impl RiskCalculator {
    /// Create a calculator from configuration.
    pub fn new(config: &MetricsConfig) -> Self {
        Self::with_starting_capital(config.starting_capital)
    }

    pub fn with_starting_capital(starting_capital: Decimal) -> Self {
        Self { starting_capital }
    }

    /// Calculate risk figures.
    pub fn calculate(&self, positions: &[Position], trades: &[Trade]) -> RiskMetrics {
        let total_exposure = saturating_sum(positions.iter().map(Position::notional));
        let unrealized_pnl = saturating_sum(positions.iter().map(|p| p.unrealized_pnl));
        let realized_pnl = saturating_sum(
            trades
                .iter()
                .filter(|t| t.is_closed())
                .map(Trade::realized_pnl),
        );

        let walk = EquityWalk::from_trades(trades, self.starting_capital);
        let max_drawdown_pct = walk.max_drawdown_pct();

        RiskMetrics {
            total_exposure,
            unrealized_pnl,
            realized_pnl,
            max_drawdown_pct,
            current_drawdown_pct: walk.current_drawdown_pct(),
            risk_level: RiskLevel::from_drawdown(max_drawdown_pct),
            open_positions: positions.len(),
        }
    }
}

impl Default for RiskCalculator {
    fn default() -> Self {
        Self::new(&MetricsConfig::default())
    }
}

fn saturating_sum(values: impl Iterator<Item = Decimal>) -> Decimal {
    values.fold(Decimal::ZERO, Decimal::saturating_add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use telemetry_core::types::{Side, TradeStatus};

    fn ts(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0).unwrap()
    }

    fn closed(id: &str, pnl: Decimal, exit_minute: u32) -> Trade {
        Trade {
            id: id.to_string(),
            symbol: "BTCUSDT".to_string(),
            side: Side::Long,
            entry_price: dec!(100),
            exit_price: Some(dec!(100)),
            size: dec!(1),
            pnl: Some(pnl),
            fees: Decimal::ZERO,
            status: TradeStatus::Closed,
            entry_time: ts(0),
            exit_time: Some(ts(exit_minute)),
        }
    }

    fn position(symbol: &str, side: Side, size: Decimal, price: Decimal, pnl: Decimal) -> Position {
        let mut p = Position::new(symbol, symbol, side, price, size, ts(0));
        p.current_price = price;
        p.unrealized_pnl = pnl;
        p
    }

    #[test]
    fn test_scenario_drawdown_low() {
        // Input deliberately out of exit order
        let trades = vec![
            closed("c", dec!(100), 3),
            closed("a", dec!(500), 1),
            closed("b", dec!(-200), 2),
        ];

        let metrics = RiskCalculator::default().calculate(&[], &trades);

        let expected = dec!(200) / dec!(10500) * dec!(100);
        assert_eq!(metrics.max_drawdown_pct, expected);
        assert!((metrics.max_drawdown_pct - dec!(1.905)).abs() < dec!(0.001));
        assert!((metrics.current_drawdown_pct - dec!(0.952)).abs() < dec!(0.001));
        assert_eq!(metrics.risk_level, RiskLevel::Low);
        assert_eq!(metrics.realized_pnl, dec!(400));
    }

    #[test]
    fn test_no_closed_trades() {
        let open = Trade::open("o", "BTCUSDT", Side::Long, dec!(100), dec!(1), ts(0));
        let metrics = RiskCalculator::default().calculate(&[], &[open]);

        assert_eq!(metrics.max_drawdown_pct, Decimal::ZERO);
        assert_eq!(metrics.risk_level, RiskLevel::Low);
        assert_eq!(metrics.open_positions, 0);
    }

    #[test]
    fn test_exposure_and_unrealized() {
        let positions = vec![
            position("BTCUSDT", Side::Long, dec!(0.5), dec!(60000), dec!(120)),
            position("ETHUSDT", Side::Short, dec!(-2), dec!(3000), dec!(-45.5)),
        ];

        let metrics = RiskCalculator::default().calculate(&positions, &[]);
        assert_eq!(metrics.total_exposure, dec!(36000));
        assert_eq!(metrics.unrealized_pnl, dec!(74.5));
        assert_eq!(metrics.open_positions, 2);
    }

    #[test]
    fn test_missing_pnl_contributes_nothing() {
        let mut trade = closed("x", dec!(0), 1);
        trade.pnl = None;
        let mut no_exit = closed("y", dec!(-5000), 2);
        no_exit.exit_time = None;

        let metrics = RiskCalculator::default().calculate(&[], &[trade, no_exit]);
        assert_eq!(metrics.max_drawdown_pct, Decimal::ZERO);
        assert_eq!(metrics.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_level_boundaries_map_to_lower_tier() {
        assert_eq!(RiskLevel::from_drawdown(dec!(10)), RiskLevel::Low);
        assert_eq!(RiskLevel::from_drawdown(dec!(10.0001)), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_drawdown(dec!(15)), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_drawdown(dec!(15.5)), RiskLevel::High);
        assert_eq!(RiskLevel::from_drawdown(dec!(20)), RiskLevel::High);
        assert_eq!(RiskLevel::from_drawdown(dec!(20.01)), RiskLevel::Critical);
    }

    #[test]
    fn test_level_is_monotonic_in_drawdown() {
        let mut previous = RiskLevel::Low;
        let mut dd = Decimal::ZERO;
        while dd <= dec!(40) {
            let level = RiskLevel::from_drawdown(dd);
            assert!(level >= previous);
            previous = level;
            dd += dec!(0.25);
        }
        assert_eq!(previous, RiskLevel::Critical);
    }

    #[test]
    fn test_drawdown_never_negative() {
        let pnls = [dec!(50), dec!(-20), dec!(300), dec!(-1000), dec!(10), dec!(-3)];
        let trades: Vec<Trade> = pnls
            .iter()
            .enumerate()
            .map(|(i, pnl)| closed(&format!("t{}", i), *pnl, i as u32 + 1))
            .collect();

        for n in 0..=trades.len() {
            let metrics = RiskCalculator::default().calculate(&[], &trades[..n]);
            assert!(metrics.max_drawdown_pct >= Decimal::ZERO);
            assert!(metrics.current_drawdown_pct <= metrics.max_drawdown_pct);
        }
    }

    #[test]
    fn test_single_small_loss() {
        let trades = vec![closed("a", dec!(-50), 1)];
        let metrics = RiskCalculator::default().calculate(&[], &trades);

        assert_eq!(metrics.max_drawdown_pct, dec!(0.5));
        assert_eq!(metrics.current_drawdown_pct, dec!(0.5));
        assert_eq!(metrics.realized_pnl, dec!(-50));
        assert_eq!(metrics.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_extreme_notional_saturates() {
        let huge = Decimal::from(1_000_000_000_000_000_i64);
        let positions = vec![
            position("BTCUSDT", Side::Long, huge, huge, Decimal::MAX),
            position("ETHUSDT", Side::Long, dec!(1), dec!(10), Decimal::MAX),
        ];
        let trades = vec![closed("a", Decimal::MAX, 1), closed("b", Decimal::MAX, 2)];

        let metrics = RiskCalculator::default().calculate(&positions, &trades);
        assert_eq!(metrics.total_exposure, Decimal::MAX);
        assert_eq!(metrics.unrealized_pnl, Decimal::MAX);
        assert_eq!(metrics.realized_pnl, Decimal::MAX);
        assert_eq!(metrics.max_drawdown_pct, Decimal::ZERO);
        assert_eq!(metrics.open_positions, 2);
    }

    #[test]
    fn test_critical_drawdown() {
        let trades = vec![closed("a", dec!(-2500), 1)];
        let metrics = RiskCalculator::default().calculate(&[], &trades);
        assert_eq!(metrics.max_drawdown_pct, dec!(25));
        assert_eq!(metrics.risk_level, RiskLevel::Critical);
    }
}
