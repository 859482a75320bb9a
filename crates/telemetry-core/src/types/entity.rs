//! Entity kinds mirrored to viewers.

use serde::{Deserialize, Serialize};

/// The five record kinds pushed to every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    SystemStatus,
    Trades,
    Positions,
    Signals,
    Performance,
}

impl EntityKind {
    /// All kinds, in initial-sync order.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::SystemStatus,
        EntityKind::Trades,
        EntityKind::Positions,
        EntityKind::Signals,
        EntityKind::Performance,
    ];

    /// Number of entity kinds.
    pub const COUNT: usize = Self::ALL.len();

    /// Dense index, usable for per-kind arrays.
    pub fn index(&self) -> usize {
        match self {
            EntityKind::SystemStatus => 0,
            EntityKind::Trades => 1,
            EntityKind::Positions => 2,
            EntityKind::Signals => 3,
            EntityKind::Performance => 4,
        }
    }

    /// Server push event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            EntityKind::SystemStatus => "system-status",
            EntityKind::Trades => "trades-update",
            EntityKind::Positions => "positions-update",
            EntityKind::Signals => "signals-update",
            EntityKind::Performance => "performance-update",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::SystemStatus => "system_status",
            EntityKind::Trades => "trades",
            EntityKind::Positions => "positions",
            EntityKind::Signals => "signals",
            EntityKind::Performance => "performance",
        };
        f.write_str(name)
    }
}
