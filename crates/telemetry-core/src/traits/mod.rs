//! Core traits for the telemetry system.

mod store;

pub use store::StoreReader;
