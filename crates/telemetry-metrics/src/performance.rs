//! Performance calculator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use telemetry_core::types::Trade;

use crate::{percent, ratio, EquityPoint, EquityWalk, MetricsConfig};

/// Gross profit over gross loss.
///
/// With wins and no losses the ratio is unbounded. That case is a distinct
/// variant rather than a float infinity or a magic number; consumers that need
/// a plain number pick their own cap through [`ProfitFactor::capped`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ProfitFactor {
    Finite(Decimal),
    Unbounded,
}

impl ProfitFactor {
    pub fn is_unbounded(&self) -> bool {
        matches!(self, ProfitFactor::Unbounded)
    }

    /// Finite value, if any.
    pub fn finite(&self) -> Option<Decimal> {
        match self {
            ProfitFactor::Finite(v) => Some(*v),
            ProfitFactor::Unbounded => None,
        }
    }

    /// Numeric value with unbounded (and anything larger) clamped to `cap`.
    pub fn capped(&self, cap: Decimal) -> Decimal {
        match self {
            ProfitFactor::Finite(v) => (*v).min(cap),
            ProfitFactor::Unbounded => cap,
        }
    }
}

impl Default for ProfitFactor {
    fn default() -> Self {
        ProfitFactor::Finite(Decimal::ZERO)
    }
}

impl std::fmt::Display for ProfitFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfitFactor::Finite(v) => write!(f, "{:.2}", v),
            ProfitFactor::Unbounded => write!(f, "∞"),
        }
    }
}

/// Realized performance figures over closed trades.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Number of closed trades
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Closed trades with zero (or missing) P&L
    pub breakeven_trades: usize,
    /// Winning trades over all closed trades, in percent
    pub win_rate_pct: Decimal,
    /// Sum of winning P&L
    pub total_wins: Decimal,
    /// Absolute sum of losing P&L
    pub total_losses: Decimal,
    pub avg_win: Decimal,
    pub avg_loss: Decimal,
    pub largest_win: Decimal,
    pub largest_loss: Decimal,
    pub profit_factor: ProfitFactor,
    /// Net realized P&L
    pub total_pnl: Decimal,
    /// Net realized P&L relative to starting capital, in percent
    pub net_return_pct: Decimal,
    /// Mean over standard deviation of per-trade equity returns (not annualized)
    pub sharpe_ratio: f64,
    pub equity_curve: Vec<EquityPoint>,
}

/// Computes [`PerformanceMetrics`] from trades.
#[derive(Debug, Clone)]
pub struct PerformanceCalculator {
    starting_capital: Decimal,
}

impl PerformanceCalculator {
    /// Create a calculator from configuration.
    pub fn new(config: &MetricsConfig) -> Self {
        Self::with_starting_capital(config.starting_capital)
    }

    pub fn with_starting_capital(starting_capital: Decimal) -> Self {
        Self { starting_capital }
    }

    /// Calculate performance over the closed trades in `trades`.
    pub fn calculate(&self, trades: &[Trade]) -> PerformanceMetrics {
        let mut metrics = PerformanceMetrics::default();

        for trade in trades.iter().filter(|t| t.is_closed()) {
            let pnl = trade.realized_pnl();
            metrics.total_trades += 1;
            metrics.total_pnl = metrics.total_pnl.saturating_add(pnl);

            if pnl > Decimal::ZERO {
                metrics.winning_trades += 1;
                metrics.total_wins = metrics.total_wins.saturating_add(pnl);
                metrics.largest_win = metrics.largest_win.max(pnl);
            } else if pnl < Decimal::ZERO {
                metrics.losing_trades += 1;
                metrics.total_losses = metrics.total_losses.saturating_add(pnl.abs());
                metrics.largest_loss = metrics.largest_loss.max(pnl.abs());
            } else {
                metrics.breakeven_trades += 1;
            }
        }

        if metrics.total_trades > 0 {
            metrics.win_rate_pct = percent(
                Decimal::from(metrics.winning_trades),
                Decimal::from(metrics.total_trades),
            );
        }

        if metrics.winning_trades > 0 {
            metrics.avg_win = ratio(metrics.total_wins, Decimal::from(metrics.winning_trades));
        }
        if metrics.losing_trades > 0 {
            metrics.avg_loss = ratio(metrics.total_losses, Decimal::from(metrics.losing_trades));
        }

        metrics.profit_factor = if metrics.total_losses > Decimal::ZERO {
            ProfitFactor::Finite(ratio(metrics.total_wins, metrics.total_losses))
        } else if metrics.total_wins > Decimal::ZERO {
            ProfitFactor::Unbounded
        } else {
            ProfitFactor::Finite(Decimal::ZERO)
        };

        if self.starting_capital > Decimal::ZERO {
            metrics.net_return_pct = percent(metrics.total_pnl, self.starting_capital);
        }

        let walk = EquityWalk::from_trades(trades, self.starting_capital);
        metrics.sharpe_ratio = sharpe(&walk.returns());
        metrics.equity_curve = walk.into_points();

        metrics
    }
}

impl Default for PerformanceCalculator {
    fn default() -> Self {
        Self::new(&MetricsConfig::default())
    }
}

fn sharpe(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    if std_dev > 0.0 {
        mean / std_dev
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use telemetry_core::types::{Side, TradeStatus};

    fn ts(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0).unwrap()
    }

    fn closed(pnl: Decimal, exit_minute: u32) -> Trade {
        Trade {
            id: format!("t{}", exit_minute),
            symbol: "ETHUSDT".to_string(),
            side: Side::Short,
            entry_price: dec!(3000),
            exit_price: Some(dec!(3000)),
            size: dec!(1),
            pnl: Some(pnl),
            fees: Decimal::ZERO,
            status: TradeStatus::Closed,
            entry_time: ts(0),
            exit_time: Some(ts(exit_minute)),
        }
    }

    #[test]
    fn test_two_winners_one_loser() {
        let trades = vec![closed(dec!(300), 1), closed(dec!(-100), 2), closed(dec!(200), 3)];
        let metrics = PerformanceCalculator::default().calculate(&trades);

        assert_eq!(metrics.total_trades, 3);
        assert!((metrics.win_rate_pct - dec!(66.67)).abs() < dec!(0.01));
        assert_eq!(metrics.total_wins, dec!(500));
        assert_eq!(metrics.total_losses, dec!(100));
        assert_eq!(metrics.profit_factor, ProfitFactor::Finite(dec!(5)));
        assert_eq!(metrics.avg_win, dec!(250));
        assert_eq!(metrics.avg_loss, dec!(100));
        assert_eq!(metrics.largest_win, dec!(300));
        assert_eq!(metrics.total_pnl, dec!(400));
        assert_eq!(metrics.net_return_pct, dec!(4));
    }

    #[test]
    fn test_equity_curve_is_chronological() {
        let trades = vec![closed(dec!(100), 3), closed(dec!(500), 1), closed(dec!(-200), 2)];
        let metrics = PerformanceCalculator::default().calculate(&trades);

        let equities: Vec<Decimal> = metrics.equity_curve.iter().map(|p| p.equity).collect();
        assert_eq!(equities, vec![dec!(10500), dec!(10300), dec!(10400)]);
        assert!(metrics
            .equity_curve
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_single_losing_trade() {
        let metrics = PerformanceCalculator::default().calculate(&[closed(dec!(-50), 1)]);

        assert_eq!(metrics.equity_curve.len(), 1);
        assert_eq!(metrics.equity_curve[0].equity, dec!(9950));
        assert_eq!(metrics.profit_factor, ProfitFactor::Finite(Decimal::ZERO));
        assert_eq!(metrics.win_rate_pct, Decimal::ZERO);
        assert_eq!(metrics.avg_win, Decimal::ZERO);
        assert_eq!(metrics.largest_loss, dec!(50));
    }

    #[test]
    fn test_no_closed_trades() {
        let open = Trade::open("o", "BTCUSDT", Side::Long, dec!(1), dec!(1), ts(0));
        let metrics = PerformanceCalculator::default().calculate(&[open]);

        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.win_rate_pct, Decimal::ZERO);
        assert_eq!(metrics.profit_factor, ProfitFactor::Finite(Decimal::ZERO));
        assert!(metrics.equity_curve.is_empty());
        assert_eq!(metrics.sharpe_ratio, 0.0);
    }

    #[test]
    fn test_only_winners_is_unbounded() {
        let metrics =
            PerformanceCalculator::default().calculate(&[closed(dec!(10), 1), closed(dec!(0), 2)]);

        assert!(metrics.profit_factor.is_unbounded());
        assert_eq!(metrics.profit_factor.to_string(), "∞");
        assert_eq!(metrics.profit_factor.capped(dec!(999)), dec!(999));
        assert_eq!(metrics.breakeven_trades, 1);
        assert_eq!(metrics.win_rate_pct, dec!(50));
    }

    #[test]
    fn test_breakeven_only_is_zero_factor() {
        let mut missing = closed(dec!(0), 2);
        missing.pnl = None;
        let metrics = PerformanceCalculator::default().calculate(&[closed(dec!(0), 1), missing]);

        assert_eq!(metrics.breakeven_trades, 2);
        assert_eq!(metrics.profit_factor, ProfitFactor::Finite(Decimal::ZERO));
        assert_eq!(metrics.total_wins, Decimal::ZERO);
        assert_eq!(metrics.total_losses, Decimal::ZERO);
    }

    #[test]
    fn test_sharpe_sign_follows_mean_return() {
        let gains = vec![closed(dec!(100), 1), closed(dec!(50), 2), closed(dec!(120), 3)];
        let losses = vec![closed(dec!(-100), 1), closed(dec!(-50), 2), closed(dec!(-120), 3)];

        assert!(PerformanceCalculator::default().calculate(&gains).sharpe_ratio > 0.0);
        assert!(PerformanceCalculator::default().calculate(&losses).sharpe_ratio < 0.0);
    }

    #[test]
    fn test_extreme_pnl_saturates() {
        let trades = vec![
            closed(Decimal::MAX, 1),
            closed(Decimal::MAX, 2),
            closed(-Decimal::new(1, 20), 3),
        ];
        let metrics = PerformanceCalculator::default().calculate(&trades);

        assert_eq!(metrics.total_wins, Decimal::MAX);
        assert_eq!(metrics.profit_factor, ProfitFactor::Finite(Decimal::MAX));
        assert_eq!(metrics.total_losses, Decimal::new(1, 20));
        assert_eq!(metrics.equity_curve.len(), 3);
        assert_eq!(metrics.equity_curve[1].equity, Decimal::MAX);
    }

    #[test]
    fn test_profit_factor_display_and_cap() {
        assert_eq!(ProfitFactor::Finite(dec!(2.5)).to_string(), "2.50");
        assert_eq!(ProfitFactor::Finite(dec!(1500)).capped(dec!(999)), dec!(999));
        assert_eq!(ProfitFactor::Finite(dec!(1.2)).finite(), Some(dec!(1.2)));
        assert_eq!(ProfitFactor::Unbounded.finite(), None);
    }
}
