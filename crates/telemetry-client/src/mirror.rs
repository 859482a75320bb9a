//! Client-side mirror of the server's entity snapshots.

use chrono::{DateTime, Utc};
use telemetry_core::types::{EntityKind, PerformanceSnapshot, Position, Signal, SystemStatus, Trade};
use telemetry_core::wire::ServerMessage;
use telemetry_metrics::{
    MetricsConfig, PerformanceCalculator, PerformanceMetrics, RiskCalculator, RiskMetrics,
};

/// Result of applying one push to the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Accepted and the held value changed.
    Applied,
    /// Accepted, but identical to the held value.
    Unchanged,
    /// Older than or equal to the last accepted push of its kind; dropped.
    Stale,
}

/// Latest snapshot of every entity kind, plus derived metrics.
///
/// [`Mirror::apply`] is the only way pushes get in. Risk and performance are
/// recomputed only when an accepted trades or positions payload differs from
/// the one already held.
#[derive(Debug, Clone)]
pub struct Mirror {
    system_status: Option<SystemStatus>,
    trades: Vec<Trade>,
    positions: Vec<Position>,
    signals: Vec<Signal>,
    performance: Option<PerformanceSnapshot>,
    connected: bool,
    last_push_at: Option<DateTime<Utc>>,
    watermarks: [u64; EntityKind::COUNT],
    risk_calculator: RiskCalculator,
    performance_calculator: PerformanceCalculator,
    risk: RiskMetrics,
    performance_metrics: PerformanceMetrics,
    metrics_revision: u64,
}

impl Mirror {
    pub fn new(config: &MetricsConfig) -> Self {
        let risk_calculator = RiskCalculator::new(config);
        let performance_calculator = PerformanceCalculator::new(config);
        let risk = risk_calculator.calculate(&[], &[]);
        let performance_metrics = performance_calculator.calculate(&[]);

        Self {
            system_status: None,
            trades: Vec::new(),
            positions: Vec::new(),
            signals: Vec::new(),
            performance: None,
            connected: false,
            last_push_at: None,
            watermarks: [0; EntityKind::COUNT],
            risk_calculator,
            performance_calculator,
            risk,
            performance_metrics,
            metrics_revision: 0,
        }
    }

    /// Apply one server push.
    pub fn apply(&mut self, message: ServerMessage) -> ApplyOutcome {
        let slot = &mut self.watermarks[message.kind().index()];
        if message.seq() <= *slot {
            return ApplyOutcome::Stale;
        }
        *slot = message.seq();

        let (changed, at) = match message {
            ServerMessage::SystemStatus(push) => (replace(&mut self.system_status, push.data), push.at),
            ServerMessage::TradesUpdate(push) => {
                let changed = replace(&mut self.trades, push.data);
                if changed {
                    self.recompute(true);
                }
                (changed, push.at)
            }
            ServerMessage::PositionsUpdate(push) => {
                let changed = replace(&mut self.positions, push.data);
                if changed {
                    self.recompute(false);
                }
                (changed, push.at)
            }
            ServerMessage::SignalsUpdate(push) => (replace(&mut self.signals, push.data), push.at),
            ServerMessage::PerformanceUpdate(push) => (replace(&mut self.performance, push.data), push.at),
        };
        self.last_push_at = Some(at);

        if changed {
            ApplyOutcome::Applied
        } else {
            ApplyOutcome::Unchanged
        }
    }

    /// New connection: sequence numbers restart, so watermarks do too.
    pub fn mark_connected(&mut self) {
        self.connected = true;
        self.watermarks = [0; EntityKind::COUNT];
    }

    /// Connection lost. Snapshots are kept as last known values.
    pub fn mark_disconnected(&mut self) {
        self.connected = false;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn system_status(&self) -> Option<&SystemStatus> {
        self.system_status.as_ref()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Store-side performance rollup.
    pub fn performance(&self) -> Option<&PerformanceSnapshot> {
        self.performance.as_ref()
    }

    pub fn risk(&self) -> &RiskMetrics {
        &self.risk
    }

    /// Performance derived from the mirrored trades.
    pub fn performance_metrics(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Server time of the last accepted push.
    pub fn last_push_at(&self) -> Option<DateTime<Utc>> {
        self.last_push_at
    }

    /// Last accepted sequence number for `kind`, 0 if none yet.
    pub fn watermark(&self, kind: EntityKind) -> u64 {
        self.watermarks[kind.index()]
    }

    /// Bumped every time the derived metrics are recomputed.
    pub fn metrics_revision(&self) -> u64 {
        self.metrics_revision
    }

    fn recompute(&mut self, trades_changed: bool) {
        self.risk = self.risk_calculator.calculate(&self.positions, &self.trades);
        if trades_changed {
            self.performance_metrics = self.performance_calculator.calculate(&self.trades);
        }
        self.metrics_revision += 1;
    }
}

impl Default for Mirror {
    fn default() -> Self {
        Self::new(&MetricsConfig::default())
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}
