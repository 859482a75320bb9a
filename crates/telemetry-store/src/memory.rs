//! In-memory store.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use telemetry_core::error::StoreError;
use telemetry_core::traits::StoreReader;
use telemetry_core::types::{PerformanceSnapshot, Position, Signal, SystemStatus, Trade};

use crate::query;

#[derive(Debug, Default)]
struct Rows {
    system_status: Option<SystemStatus>,
    trades: Vec<Trade>,
    positions: Vec<Position>,
    signals: Vec<Signal>,
    performance: Vec<PerformanceSnapshot>,
}

/// Store held in process memory.
///
/// Rows are replaced wholesale through the `set_*` methods. Outages can be
/// simulated with [`MemoryStore::set_available`] and
/// [`MemoryStore::fail_next`], and slow reads with [`MemoryStore::set_latency`].
#[derive(Debug)]
pub struct MemoryStore {
    rows: RwLock<Rows>,
    available: AtomicBool,
    failures_left: AtomicUsize,
    latency_ms: AtomicU64,
    reads: AtomicU64,
}

impl MemoryStore {
    /// Create an empty, available store.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Rows::default()),
            available: AtomicBool::new(true),
            failures_left: AtomicUsize::new(0),
            latency_ms: AtomicU64::new(0),
            reads: AtomicU64::new(0),
        }
    }

    pub fn set_system_status(&self, status: Option<SystemStatus>) {
        self.write(|rows| rows.system_status = status);
    }

    pub fn set_trades(&self, trades: Vec<Trade>) {
        self.write(|rows| rows.trades = trades);
    }

    pub fn set_positions(&self, positions: Vec<Position>) {
        self.write(|rows| rows.positions = positions);
    }

    pub fn set_signals(&self, signals: Vec<Signal>) {
        self.write(|rows| rows.signals = signals);
    }

    /// Append a performance rollup.
    pub fn push_performance(&self, snapshot: PerformanceSnapshot) {
        self.write(|rows| rows.performance.push(snapshot));
    }

    /// Mark the store reachable or not.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Fail the next `count` reads, whatever their kind.
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Delay every read by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of read attempts, failed ones included.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    fn write(&self, f: impl FnOnce(&mut Rows)) {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut rows);
    }

    fn read<T>(&self, f: impl FnOnce(&Rows) -> T) -> T {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        f(&rows)
    }

    async fn begin_read(&self) -> Result<(), StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }

        let injected = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }

        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreReader for MemoryStore {
    async fn system_status(&self) -> Result<Option<SystemStatus>, StoreError> {
        self.begin_read().await?;
        Ok(self.read(|rows| rows.system_status.clone()))
    }

    async fn recent_trades(&self, limit: usize) -> Result<Vec<Trade>, StoreError> {
        self.begin_read().await?;
        let trades = self.read(|rows| rows.trades.clone());
        Ok(query::recent_trades(trades, limit))
    }

    async fn open_positions(&self) -> Result<Vec<Position>, StoreError> {
        self.begin_read().await?;
        let positions = self.read(|rows| rows.positions.clone());
        Ok(query::open_positions(positions))
    }

    async fn recent_signals(
        &self,
        limit: usize,
        pending_only: bool,
    ) -> Result<Vec<Signal>, StoreError> {
        self.begin_read().await?;
        let signals = self.read(|rows| rows.signals.clone());
        Ok(query::recent_signals(signals, limit, pending_only))
    }

    async fn latest_performance(&self) -> Result<Option<PerformanceSnapshot>, StoreError> {
        self.begin_read().await?;
        let rows = self.read(|rows| rows.performance.clone());
        Ok(query::latest_performance(rows))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use telemetry_core::types::{Side, SignalStatus};

    fn ts(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap() + ChronoDuration::minutes(minute)
    }

    fn signal(id: &str, status: SignalStatus, minute: i64) -> Signal {
        Signal {
            id: id.to_string(),
            symbol: "BTCUSDT".to_string(),
            side: Side::Long,
            confidence: 0.8,
            price: dec!(64000),
            reason: None,
            status,
            created_at: ts(minute),
        }
    }

    #[tokio::test]
    async fn test_recent_trades_newest_first_and_limited() {
        let store = MemoryStore::new();
        store.set_trades(
            (0..60)
                .map(|i| Trade::open(format!("t{}", i), "BTCUSDT", Side::Long, dec!(1), dec!(1), ts(i)))
                .collect(),
        );

        let trades = store.recent_trades(50).await.unwrap();
        assert_eq!(trades.len(), 50);
        assert_eq!(trades[0].id, "t59");
        assert_eq!(trades[49].id, "t10");
    }

    #[tokio::test]
    async fn test_positions_by_update_time() {
        let store = MemoryStore::new();
        let mut older = Position::new("p1", "BTCUSDT", Side::Long, dec!(1), dec!(1), ts(0));
        older.updated_at = ts(1);
        let mut newer = Position::new("p2", "ETHUSDT", Side::Long, dec!(1), dec!(1), ts(0));
        newer.updated_at = ts(5);
        store.set_positions(vec![older, newer]);

        let positions = store.open_positions().await.unwrap();
        let ids: Vec<&str> = positions.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p1"]);
    }

    #[tokio::test]
    async fn test_signal_filtering() {
        let store = MemoryStore::new();
        store.set_signals(vec![
            signal("s1", SignalStatus::Pending, 1),
            signal("s2", SignalStatus::Executed, 2),
            signal("s3", SignalStatus::Pending, 3),
        ]);

        let pending = store.recent_signals(20, true).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, "s3");

        let all = store.recent_signals(2, false).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s3", "s2"]);
    }

    #[tokio::test]
    async fn test_latest_performance() {
        let store = MemoryStore::new();
        assert!(store.latest_performance().await.unwrap().is_none());

        for (minute, equity) in [(5, dec!(10100)), (9, dec!(10250)), (2, dec!(9900))] {
            store.push_performance(PerformanceSnapshot {
                equity,
                daily_pnl: Decimal::ZERO,
                win_rate: Decimal::ZERO,
                profit_factor: Decimal::ZERO,
                sharpe_ratio: 0.0,
                max_drawdown: Decimal::ZERO,
                created_at: ts(minute),
            });
        }

        let latest = store.latest_performance().await.unwrap().unwrap();
        assert_eq!(latest.equity, dec!(10250));
    }

    #[tokio::test]
    async fn test_injected_failures_then_recovery() {
        let store = MemoryStore::new();
        store.fail_next(2);

        assert!(matches!(store.system_status().await, Err(StoreError::Unavailable(_))));
        assert!(matches!(store.open_positions().await, Err(StoreError::Unavailable(_))));
        assert!(store.open_positions().await.is_ok());
        assert_eq!(store.read_count(), 3);
    }

    #[tokio::test]
    async fn test_offline_store() {
        let store = MemoryStore::new();
        store.set_available(false);
        assert!(store.recent_trades(10).await.is_err());

        store.set_available(true);
        assert!(store.recent_trades(10).await.unwrap().is_empty());
    }
}
