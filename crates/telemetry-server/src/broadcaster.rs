//! Poll-and-push engine.
//!
//! One timer per (session, kind) re-reads the store at that kind's cadence
//! and pushes the full snapshot. Timers await their own fetch, so a kind never
//! has two fetches in flight for the same session, and a slow kind only
//! delays itself.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use telemetry_core::error::StoreError;
use telemetry_core::traits::StoreReader;
use telemetry_core::types::EntityKind;
use telemetry_core::wire::Snapshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::config::ServerConfig;
use crate::registry::{SessionHandle, SessionId, SessionRegistry, TimerGuard};

/// Counters for the server.
#[derive(Debug, Default)]
pub struct ServerStats {
    /// Total connections accepted.
    pub connections_accepted: AtomicU64,

    /// Connections turned away at the session limit.
    pub connections_rejected: AtomicU64,

    /// Snapshots queued for a transport.
    pub pushes_sent: AtomicU64,

    /// Store reads that failed; the cycle was skipped.
    pub fetch_failures: AtomicU64,

    /// Refresh requests received from viewers.
    pub refresh_requests: AtomicU64,

    /// Refresh requests dropped because the same kind was still in flight.
    pub refreshes_coalesced: AtomicU64,

    /// Frames from viewers that could not be parsed.
    pub malformed_messages: AtomicU64,

    /// Sessions dropped because a send timed out.
    pub send_timeouts: AtomicU64,
}

impl ServerStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of current stats.
    pub fn snapshot(&self) -> ServerStatsSnapshot {
        ServerStatsSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_rejected: self.connections_rejected.load(Ordering::Relaxed),
            pushes_sent: self.pushes_sent.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            refresh_requests: self.refresh_requests.load(Ordering::Relaxed),
            refreshes_coalesced: self.refreshes_coalesced.load(Ordering::Relaxed),
            malformed_messages: self.malformed_messages.load(Ordering::Relaxed),
            send_timeouts: self.send_timeouts.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of server stats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatsSnapshot {
    pub connections_accepted: u64,
    pub connections_rejected: u64,
    pub pushes_sent: u64,
    pub fetch_failures: u64,
    pub refresh_requests: u64,
    pub refreshes_coalesced: u64,
    pub malformed_messages: u64,
    pub send_timeouts: u64,
}

/// Fetches snapshots from the store and pushes them to sessions.
///
/// Cheap to clone; clones share the store, registry and stats.
#[derive(Clone)]
pub struct Broadcaster {
    store: Arc<dyn StoreReader>,
    config: Arc<ServerConfig>,
    registry: Arc<SessionRegistry>,
    stats: Arc<ServerStats>,
}

impl Broadcaster {
    pub fn new(store: Arc<dyn StoreReader>, config: ServerConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            registry: Arc::new(SessionRegistry::new()),
            stats: Arc::new(ServerStats::new()),
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> &Arc<ServerStats> {
        &self.stats
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Read the current snapshot of `kind` from the store.
    pub async fn fetch(&self, kind: EntityKind) -> Result<Snapshot, StoreError> {
        let snapshot = match kind {
            EntityKind::SystemStatus => Snapshot::SystemStatus(self.store.system_status().await?),
            EntityKind::Trades => {
                Snapshot::Trades(self.store.recent_trades(self.config.trades_limit).await?)
            }
            EntityKind::Positions => Snapshot::Positions(self.store.open_positions().await?),
            EntityKind::Signals => Snapshot::Signals(
                self.store
                    .recent_signals(self.config.signals_limit, self.config.signals_pending_only)
                    .await?,
            ),
            EntityKind::Performance => {
                Snapshot::Performance(self.store.latest_performance().await?)
            }
        };
        Ok(snapshot)
    }

    /// Fetch `kind` and push it to `session`.
    ///
    /// The sequence number is taken before the fetch starts. A failed fetch
    /// is logged and skipped; nothing is pushed for that cycle. Returns
    /// whether a message was queued.
    pub async fn push_kind(&self, session: &SessionHandle, kind: EntityKind) -> bool {
        if session.is_closed() {
            return false;
        }

        let seq = session.next_seq(kind);
        let snapshot = match self.fetch(kind).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.stats.fetch_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    session = %session.id(),
                    %kind,
                    seq,
                    error = %e,
                    "Store fetch failed, skipping cycle"
                );
                return false;
            }
        };

        let rows = snapshot.len();
        if session.push(snapshot.into_message(seq, Utc::now())) {
            self.stats.pushes_sent.fetch_add(1, Ordering::Relaxed);
            trace!(session = %session.id(), %kind, seq, rows, "Snapshot pushed");
            true
        } else {
            debug!(session = %session.id(), %kind, seq, "Session closed, push dropped");
            false
        }
    }

    /// Initial sync for a new session, then start its timers.
    ///
    /// All kinds are fetched concurrently. Timers start only after the
    /// initial sync has finished and first fire one period later.
    pub async fn on_connect(&self, session: &Arc<SessionHandle>) {
        let pushed = join_all(
            EntityKind::ALL
                .into_iter()
                .map(|kind| self.push_kind(session, kind)),
        )
        .await
        .into_iter()
        .filter(|ok| *ok)
        .count();

        let timers: Vec<JoinHandle<()>> = EntityKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let period = self.config.cadence.period(kind)?;
                Some(self.spawn_timer(Arc::clone(session), kind, period))
            })
            .collect();
        let timer_count = timers.len();

        if self.registry.attach_timers(session.id(), timers) {
            info!(
                session = %session.id(),
                pushed,
                timers = timer_count,
                "Initial sync complete"
            );
        } else {
            debug!(session = %session.id(), "Session released during initial sync");
        }
    }

    /// Push a fresh snapshot of `kind` outside the regular cadence.
    ///
    /// Runs on its own task so the caller's read loop is never blocked. At
    /// most one refresh per (session, kind) runs at a time; a request arriving
    /// while one is in flight is dropped and `None` is returned.
    pub fn on_demand_refresh(
        &self,
        session: &Arc<SessionHandle>,
        kind: EntityKind,
    ) -> Option<JoinHandle<bool>> {
        self.stats.refresh_requests.fetch_add(1, Ordering::Relaxed);

        let Some(guard) = session.try_begin_refresh(kind) else {
            self.stats.refreshes_coalesced.fetch_add(1, Ordering::Relaxed);
            debug!(session = %session.id(), %kind, "Refresh already in flight, request dropped");
            return None;
        };
        debug!(session = %session.id(), %kind, "Refresh requested");

        let this = self.clone();
        let session = Arc::clone(session);
        Some(tokio::spawn(async move {
            let _guard = guard;
            this.push_kind(&session, kind).await
        }))
    }

    /// Release the session and all of its timers.
    pub fn on_disconnect(&self, id: SessionId) -> bool {
        self.registry.release(id)
    }

    fn spawn_timer(&self, session: Arc<SessionHandle>, kind: EntityKind, period: Duration) -> JoinHandle<()> {
        let guard = self.registry.timer_guard();
        let this = self.clone();
        tokio::spawn(async move { this.run_timer(session, kind, period, guard).await })
    }

    async fn run_timer(
        self,
        session: Arc<SessionHandle>,
        kind: EntityKind,
        period: Duration,
        _guard: TimerGuard,
    ) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if session.is_closed() {
                break;
            }
            self.push_kind(&session, kind).await;
        }

        trace!(session = %session.id(), %kind, "Timer stopped");
    }
}
