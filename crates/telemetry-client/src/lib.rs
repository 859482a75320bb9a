//! Client side of the telemetry feed.
//!
//! [`SyncAgent`] keeps one connection to the server, feeds every push into a
//! [`Mirror`] and publishes it on a watch channel. Risk and performance
//! figures are derived locally from the mirrored trades and positions.

mod agent;
mod mirror;

pub use agent::{ClientConfig, ReconnectPolicy, SyncAgent, SyncHandle};
pub use mirror::{ApplyOutcome, Mirror};
