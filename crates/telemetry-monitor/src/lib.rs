//! Logging setup and TUI dashboard.

mod dashboard;
mod logging;

pub use dashboard::{Dashboard, DashboardState, DEFAULT_HEARTBEAT_MAX_AGE_SECS};
pub use logging::setup_logging;
