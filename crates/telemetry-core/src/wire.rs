//! Wire protocol between the broadcast server and viewers.
//!
//! Every frame is a JSON object tagged by an `event` field. Server pushes
//! carry a per-(session, kind) sequence number and the server timestamp so a
//! viewer can drop a snapshot that arrives after a newer one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TelemetryError;
use crate::types::{EntityKind, PerformanceSnapshot, Position, Signal, SystemStatus, Trade};

/// A full snapshot of one entity kind, as fetched from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    SystemStatus(Option<SystemStatus>),
    Trades(Vec<Trade>),
    Positions(Vec<Position>),
    Signals(Vec<Signal>),
    Performance(Option<PerformanceSnapshot>),
}

impl Snapshot {
    /// Entity kind carried by this snapshot.
    pub fn kind(&self) -> EntityKind {
        match self {
            Snapshot::SystemStatus(_) => EntityKind::SystemStatus,
            Snapshot::Trades(_) => EntityKind::Trades,
            Snapshot::Positions(_) => EntityKind::Positions,
            Snapshot::Signals(_) => EntityKind::Signals,
            Snapshot::Performance(_) => EntityKind::Performance,
        }
    }

    /// Number of rows in the snapshot.
    pub fn len(&self) -> usize {
        match self {
            Snapshot::SystemStatus(row) => usize::from(row.is_some()),
            Snapshot::Trades(rows) => rows.len(),
            Snapshot::Positions(rows) => rows.len(),
            Snapshot::Signals(rows) => rows.len(),
            Snapshot::Performance(row) => usize::from(row.is_some()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wrap the snapshot into a push message.
    pub fn into_message(self, seq: u64, at: DateTime<Utc>) -> ServerMessage {
        match self {
            Snapshot::SystemStatus(data) => ServerMessage::SystemStatus(Push { seq, at, data }),
            Snapshot::Trades(data) => ServerMessage::TradesUpdate(Push { seq, at, data }),
            Snapshot::Positions(data) => ServerMessage::PositionsUpdate(Push { seq, at, data }),
            Snapshot::Signals(data) => ServerMessage::SignalsUpdate(Push { seq, at, data }),
            Snapshot::Performance(data) => ServerMessage::PerformanceUpdate(Push { seq, at, data }),
        }
    }
}

/// Push envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Push<T> {
    /// Monotonic per (session, kind), assigned when the fetch starts
    pub seq: u64,
    /// Server time the push was produced
    pub at: DateTime<Utc>,
    pub data: T,
}

/// Server to viewer messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ServerMessage {
    SystemStatus(Push<Option<SystemStatus>>),
    TradesUpdate(Push<Vec<Trade>>),
    PositionsUpdate(Push<Vec<Position>>),
    SignalsUpdate(Push<Vec<Signal>>),
    PerformanceUpdate(Push<Option<PerformanceSnapshot>>),
}

impl ServerMessage {
    /// Entity kind carried by this message.
    pub fn kind(&self) -> EntityKind {
        match self {
            ServerMessage::SystemStatus(_) => EntityKind::SystemStatus,
            ServerMessage::TradesUpdate(_) => EntityKind::Trades,
            ServerMessage::PositionsUpdate(_) => EntityKind::Positions,
            ServerMessage::SignalsUpdate(_) => EntityKind::Signals,
            ServerMessage::PerformanceUpdate(_) => EntityKind::Performance,
        }
    }

    /// Sequence number of this push.
    pub fn seq(&self) -> u64 {
        match self {
            ServerMessage::SystemStatus(p) => p.seq,
            ServerMessage::TradesUpdate(p) => p.seq,
            ServerMessage::PositionsUpdate(p) => p.seq,
            ServerMessage::SignalsUpdate(p) => p.seq,
            ServerMessage::PerformanceUpdate(p) => p.seq,
        }
    }

    /// Encode as a JSON text frame.
    pub fn to_json(&self) -> Result<String, TelemetryError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a JSON text frame.
    pub fn from_json(text: &str) -> Result<Self, TelemetryError> {
        serde_json::from_str(text).map_err(|e| TelemetryError::Protocol(e.to_string()))
    }
}

/// Viewer to server messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientMessage {
    RequestSystemStatus,
    RequestTrades,
    RequestPositions,
    RequestSignals,
    RequestPerformance,
}

impl ClientMessage {
    /// Build the refresh request for an entity kind.
    pub fn refresh(kind: EntityKind) -> Self {
        match kind {
            EntityKind::SystemStatus => ClientMessage::RequestSystemStatus,
            EntityKind::Trades => ClientMessage::RequestTrades,
            EntityKind::Positions => ClientMessage::RequestPositions,
            EntityKind::Signals => ClientMessage::RequestSignals,
            EntityKind::Performance => ClientMessage::RequestPerformance,
        }
    }

    /// Entity kind the request refers to.
    pub fn kind(&self) -> EntityKind {
        match self {
            ClientMessage::RequestSystemStatus => EntityKind::SystemStatus,
            ClientMessage::RequestTrades => EntityKind::Trades,
            ClientMessage::RequestPositions => EntityKind::Positions,
            ClientMessage::RequestSignals => EntityKind::Signals,
            ClientMessage::RequestPerformance => EntityKind::Performance,
        }
    }

    /// Encode as a JSON text frame.
    pub fn to_json(&self) -> Result<String, TelemetryError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a JSON text frame.
    pub fn from_json(text: &str) -> Result<Self, TelemetryError> {
        serde_json::from_str(text).map_err(|e| TelemetryError::Protocol(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Side, Trade};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_push_event_names_match_kinds() {
        let snapshots = [
            Snapshot::SystemStatus(None),
            Snapshot::Trades(Vec::new()),
            Snapshot::Positions(Vec::new()),
            Snapshot::Signals(Vec::new()),
            Snapshot::Performance(None),
        ];

        for snapshot in snapshots {
            let kind = snapshot.kind();
            let json = snapshot.into_message(1, at()).to_json().unwrap();
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value["event"], kind.event_name());
        }
    }

    #[test]
    fn test_trades_update_decodes() {
        let trade = Trade::open("t1", "BTCUSDT", Side::Long, dec!(64000.5), dec!(0.1), at())
            .close(dec!(64100.5), at());
        let message = Snapshot::Trades(vec![trade.clone()]).into_message(7, at());

        let decoded = ServerMessage::from_json(&message.to_json().unwrap()).unwrap();
        assert_eq!(decoded.kind(), EntityKind::Trades);
        assert_eq!(decoded.seq(), 7);
        match decoded {
            ServerMessage::TradesUpdate(push) => assert_eq!(push.data, vec![trade]),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_null_system_status_payload() {
        let json = Snapshot::SystemStatus(None).into_message(3, at()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["data"].is_null());
        assert_eq!(value["seq"], 3);
    }

    #[test]
    fn test_client_requests() {
        assert_eq!(
            ClientMessage::from_json(r#"{"event":"request-trades"}"#).unwrap(),
            ClientMessage::RequestTrades
        );
        assert_eq!(
            ClientMessage::refresh(EntityKind::Signals).to_json().unwrap(),
            r#"{"event":"request-signals"}"#
        );
        for kind in EntityKind::ALL {
            assert_eq!(ClientMessage::refresh(kind).kind(), kind);
        }
    }

    #[test]
    fn test_malformed_frames_are_protocol_errors() {
        assert!(matches!(
            ClientMessage::from_json(r#"{"event":"request-everything"}"#),
            Err(TelemetryError::Protocol(_))
        ));
        assert!(matches!(
            ServerMessage::from_json("not json"),
            Err(TelemetryError::Protocol(_))
        ));
    }
}
