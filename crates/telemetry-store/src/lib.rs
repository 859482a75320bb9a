//! Store readers for trading telemetry.
//!
//! The store itself is owned by the trading engine; this crate only reads it.

mod csv_store;
mod memory;
mod query;

pub use csv_store::CsvStore;
pub use memory::MemoryStore;

use std::sync::Arc;
use telemetry_core::error::StoreError;
use telemetry_core::traits::StoreReader;
use tracing::info;

/// Open a store reader from a connection string.
///
/// Supported forms:
/// - `memory://` - an empty in-process store
/// - `csv://<dir>` - a directory of CSV exports
/// - `<dir>` - same as `csv://<dir>`
pub fn open_store(url: &str) -> Result<Arc<dyn StoreReader>, StoreError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(StoreError::InvalidUrl("empty store URL".to_string()));
    }

    let store: Arc<dyn StoreReader> = match url.split_once("://") {
        Some(("memory", _)) => Arc::new(MemoryStore::new()),
        Some(("csv", path)) => Arc::new(CsvStore::new(path)?),
        Some((scheme, _)) => {
            return Err(StoreError::InvalidUrl(format!(
                "unsupported store scheme '{}'",
                scheme
            )));
        }
        None => Arc::new(CsvStore::new(url)?),
    };

    info!(store = store.name(), "Store reader opened");
    Ok(store)
}
