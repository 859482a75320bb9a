//! Poll-and-broadcast telemetry server.
//!
//! Every connected session gets an initial snapshot of each entity kind and
//! then one independent timer per kind that re-fetches from the store and
//! pushes a full snapshot. The [`SessionRegistry`] owns those timers and is
//! the only place they are cancelled.

mod broadcaster;
mod config;
mod registry;
mod server;

pub use broadcaster::{Broadcaster, ServerStats, ServerStatsSnapshot};
pub use config::{CadenceConfig, ServerConfig};
pub use registry::{SessionHandle, SessionId, SessionRegistry};
pub use server::TelemetryServer;
