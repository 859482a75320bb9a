//! Core types and traits for trading telemetry.
//!
//! This crate provides the foundational building blocks including:
//! - Record types mirrored from the store (Trade, Position, Signal, SystemStatus, PerformanceSnapshot)
//! - The wire protocol spoken between the broadcast server and its viewers
//! - The read-only store trait every snapshot is fetched through

pub mod types;
pub mod traits;
pub mod wire;
pub mod error;

pub use error::{StoreError, TelemetryError, TelemetryResult, TransportError};
pub use types::*;
pub use traits::*;
pub use wire::{ClientMessage, Push, ServerMessage, Snapshot};
