//! Metrics report generation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use telemetry_core::types::{PerformanceSnapshot, Position, Trade};

use crate::{MetricsConfig, PerformanceCalculator, PerformanceMetrics, RiskCalculator, RiskMetrics};

/// Combined risk and performance report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    pub generated_at: DateTime<Utc>,
    pub starting_capital: Decimal,
    pub risk: RiskMetrics,
    pub performance: PerformanceMetrics,
    /// Store-side rollup, shown next to the locally derived figures
    pub store_snapshot: Option<PerformanceSnapshot>,
}

impl MetricsReport {
    /// Run both calculators over a batch of rows.
    pub fn build(
        config: &MetricsConfig,
        positions: &[Position],
        trades: &[Trade],
        store_snapshot: Option<PerformanceSnapshot>,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            starting_capital: config.starting_capital,
            risk: RiskCalculator::new(config).calculate(positions, trades),
            performance: PerformanceCalculator::new(config).calculate(trades),
            store_snapshot,
        }
    }

    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let risk = &self.risk;
        let perf = &self.performance;
        let mut s = String::new();

        s.push_str("═══════════════════════════════════════════════════════════\n");
        s.push_str("                     TELEMETRY REPORT                       \n");
        s.push_str("═══════════════════════════════════════════════════════════\n\n");

        s.push_str("RISK\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Risk Level:          {}\n", risk.risk_level));
        s.push_str(&format!("  Max Drawdown:        {:.2}%\n", risk.max_drawdown_pct));
        s.push_str(&format!("  Current Drawdown:    {:.2}%\n", risk.current_drawdown_pct));
        s.push_str(&format!("  Total Exposure:      ${:.2}\n", risk.total_exposure));
        s.push_str(&format!("  Unrealized P&L:      ${:.2}\n", risk.unrealized_pnl));
        s.push_str(&format!("  Open Positions:      {}\n", risk.open_positions));
        s.push('\n');

        s.push_str("PERFORMANCE\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Starting Capital:    ${:.2}\n", self.starting_capital));
        s.push_str(&format!("  Net P&L:             ${:.2}\n", perf.total_pnl));
        s.push_str(&format!("  Net Return:          {:.2}%\n", perf.net_return_pct));
        s.push_str(&format!("  Profit Factor:       {}\n", perf.profit_factor));
        s.push_str(&format!("  Sharpe (per trade):  {:.2}\n", perf.sharpe_ratio));
        s.push('\n');

        s.push_str("TRADE STATISTICS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Closed Trades:       {}\n", perf.total_trades));
        s.push_str(&format!("  Winning Trades:      {}\n", perf.winning_trades));
        s.push_str(&format!("  Losing Trades:       {}\n", perf.losing_trades));
        s.push_str(&format!("  Breakeven Trades:    {}\n", perf.breakeven_trades));
        s.push_str(&format!("  Win Rate:            {:.2}%\n", perf.win_rate_pct));
        s.push_str(&format!("  Avg Win:             ${:.2}\n", perf.avg_win));
        s.push_str(&format!("  Avg Loss:            ${:.2}\n", perf.avg_loss));
        s.push_str(&format!("  Equity Points:       {}\n", perf.equity_curve.len()));
        s.push('\n');

        if let Some(snapshot) = &self.store_snapshot {
            s.push_str("STORE ROLLUP\n");
            s.push_str("───────────────────────────────────────────────────────────\n");
            s.push_str(&format!("  Equity:              ${:.2}\n", snapshot.equity));
            s.push_str(&format!("  Daily P&L:           ${:.2}\n", snapshot.daily_pnl));
            s.push_str(&format!("  Win Rate:            {:.2}%\n", snapshot.win_rate));
            s.push_str(&format!("  Profit Factor:       {:.2}\n", snapshot.profit_factor));
            s.push_str(&format!("  Max Drawdown:        {:.2}%\n", snapshot.max_drawdown));
            s.push_str(&format!("  As Of:               {}\n", snapshot.created_at));
            s.push('\n');
        }

        s.push_str("═══════════════════════════════════════════════════════════\n");

        s
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV (equity curve only).
    pub fn equity_to_csv(&self) -> String {
        let mut csv = String::from("timestamp,equity\n");
        for point in &self.performance.equity_curve {
            csv.push_str(&format!("{},{}\n", point.timestamp.to_rfc3339(), point.equity));
        }
        csv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use telemetry_core::types::Side;

    fn trades() -> Vec<Trade> {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        vec![
            Trade::open("a", "BTCUSDT", Side::Long, dec!(100), dec!(10), t0)
                .close(dec!(150), t0 + chrono::Duration::minutes(5)),
            Trade::open("b", "BTCUSDT", Side::Long, dec!(100), dec!(10), t0)
                .close(dec!(80), t0 + chrono::Duration::minutes(9)),
        ]
    }

    #[test]
    fn test_report_summary() {
        let report = MetricsReport::build(&MetricsConfig::default(), &[], &trades(), None);

        let summary = report.summary();
        assert!(summary.contains("Risk Level:          LOW"));
        assert!(summary.contains("Net P&L:             $300.00"));
        assert!(summary.contains("Win Rate:            50.00%"));
        assert!(summary.contains("Profit Factor:       2.50"));
        assert!(!summary.contains("STORE ROLLUP"));
    }

    #[test]
    fn test_equity_csv() {
        let report = MetricsReport::build(&MetricsConfig::default(), &[], &trades(), None);

        let csv = report.equity_to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "timestamp,equity");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].ends_with(",10500"));
        assert!(lines[2].ends_with(",10300"));
    }
}
