//! Server configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use telemetry_core::types::EntityKind;

/// Poll cadence per entity kind, in milliseconds. Zero disables the timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    pub system_status_ms: u64,
    pub trades_ms: u64,
    pub positions_ms: u64,
    pub signals_ms: u64,
    pub performance_ms: u64,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            system_status_ms: 1000,
            trades_ms: 2000,
            positions_ms: 2000,
            signals_ms: 1000,
            performance_ms: 5000,
        }
    }
}

impl CadenceConfig {
    /// Same cadence for every kind.
    pub fn uniform(ms: u64) -> Self {
        Self {
            system_status_ms: ms,
            trades_ms: ms,
            positions_ms: ms,
            signals_ms: ms,
            performance_ms: ms,
        }
    }

    fn millis(&self, kind: EntityKind) -> u64 {
        match kind {
            EntityKind::SystemStatus => self.system_status_ms,
            EntityKind::Trades => self.trades_ms,
            EntityKind::Positions => self.positions_ms,
            EntityKind::Signals => self.signals_ms,
            EntityKind::Performance => self.performance_ms,
        }
    }

    /// Timer period for a kind, `None` when its timer is disabled.
    pub fn period(&self, kind: EntityKind) -> Option<Duration> {
        match self.millis(kind) {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Kinds that run a timer.
    pub fn timed_kinds(&self) -> Vec<EntityKind> {
        EntityKind::ALL
            .into_iter()
            .filter(|kind| self.period(*kind).is_some())
            .collect()
    }
}

/// Configuration for the telemetry server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: String,

    /// Maximum number of concurrent sessions.
    pub max_sessions: usize,

    /// Sends slower than this close the session. Also bounds the
    /// WebSocket handshake of a new connection.
    pub send_timeout_ms: u64,

    /// Trades per snapshot.
    pub trades_limit: usize,

    /// Signals per snapshot.
    pub signals_limit: usize,

    /// Only push signals still awaiting a decision.
    pub signals_pending_only: bool,

    pub cadence: CadenceConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3001".to_string(),
            max_sessions: 100,
            send_timeout_ms: 5000,
            trades_limit: 50,
            signals_limit: 20,
            signals_pending_only: true,
            cadence: CadenceConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}
