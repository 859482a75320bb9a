//! Error types for the telemetry system.

use thiserror::Error;

/// Top-level telemetry error.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Store reader errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),

    #[error("Parse error in {source_name}: {message}")]
    Parse { source_name: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transport (WebSocket) errors.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Connection closed")]
    Closed,

    #[error("Send timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
}

/// Result type alias for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
