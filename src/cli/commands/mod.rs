//! CLI command implementations.

pub mod report;
pub mod serve;
pub mod validate;
pub mod watch;
