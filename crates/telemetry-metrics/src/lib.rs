//! Risk and performance analytics.
//!
//! Both calculators are pure: they take an ordered batch of trade and
//! position rows and return figures, with no I/O and no state beyond their
//! inputs. They are total over well-typed input; anomalous rows (a missing
//! P&L, a closed trade without an exit time) contribute nothing instead of
//! failing.

mod equity;
mod performance;
mod report;
mod risk;

pub use equity::{EquityPoint, EquityWalk};
pub use performance::{PerformanceCalculator, PerformanceMetrics, ProfitFactor};
pub use report::MetricsReport;
pub use risk::{RiskCalculator, RiskLevel, RiskMetrics};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Calculator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Capital the equity curve and drawdown scan start from
    pub starting_capital: Decimal,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            starting_capital: dec!(10000),
        }
    }
}

/// `numerator / denominator`, clamped to the `Decimal` range when the
/// quotient does not fit. The denominator must be non-zero.
pub(crate) fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    numerator.checked_div(denominator).unwrap_or_else(|| {
        if numerator.is_sign_negative() != denominator.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        }
    })
}

/// `numerator / denominator` in percent, clamped like [`ratio`].
pub(crate) fn percent(numerator: Decimal, denominator: Decimal) -> Decimal {
    ratio(numerator, denominator).saturating_mul(dec!(100))
}
