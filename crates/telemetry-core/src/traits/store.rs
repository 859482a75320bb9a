//! Store reader trait definition.

use crate::error::StoreError;
use crate::types::{PerformanceSnapshot, Position, Signal, SystemStatus, Trade};
use async_trait::async_trait;

/// Read-only query surface over the five mirrored record kinds.
///
/// One instance is built at process start and shared by handle. Readers must
/// tolerate concurrent calls; a slow call may suspend its caller but must not
/// block other callers.
#[async_trait]
pub trait StoreReader: Send + Sync {
    /// Get the engine status row, if the engine has written one.
    async fn system_status(&self) -> Result<Option<SystemStatus>, StoreError>;

    /// Fetch the most recent trades.
    ///
    /// # Arguments
    /// * `limit` - Maximum number of rows
    ///
    /// # Returns
    /// Trades ordered by entry time, newest first
    async fn recent_trades(&self, limit: usize) -> Result<Vec<Trade>, StoreError>;

    /// Fetch all open positions, most recently updated first.
    async fn open_positions(&self) -> Result<Vec<Position>, StoreError>;

    /// Fetch the most recent signals.
    ///
    /// # Arguments
    /// * `limit` - Maximum number of rows
    /// * `pending_only` - Restrict to signals still awaiting a decision
    ///
    /// # Returns
    /// Signals ordered by creation time, newest first
    async fn recent_signals(
        &self,
        limit: usize,
        pending_only: bool,
    ) -> Result<Vec<Signal>, StoreError>;

    /// Get the latest performance rollup.
    async fn latest_performance(&self) -> Result<Option<PerformanceSnapshot>, StoreError>;

    /// Get the store name.
    fn name(&self) -> &str;
}
