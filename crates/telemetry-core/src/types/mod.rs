//! Record types mirrored from the store.

mod entity;
mod performance;
mod position;
mod signal;
mod system;
mod trade;

pub use entity::EntityKind;
pub use performance::PerformanceSnapshot;
pub use position::Position;
pub use signal::{Signal, SignalStatus};
pub use system::{EngineCounters, SystemStatus, TradingMode};
pub use trade::{Side, Trade, TradeStatus};
