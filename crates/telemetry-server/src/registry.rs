//! Session registry.
//!
//! Owns every live session and the timers polling on its behalf. A session is
//! released exactly once: its outbound channel is closed under the session
//! lock before its timers are aborted, so a push racing with the release is
//! either delivered before it or refused after it.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use telemetry_core::types::EntityKind;
use telemetry_core::wire::ServerMessage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

/// Unique session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle for a connected session.
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    peer: Option<SocketAddr>,
    outbound: Mutex<Option<mpsc::UnboundedSender<ServerMessage>>>,
    seqs: [AtomicU64; EntityKind::COUNT],
    refreshing: [AtomicBool; EntityKind::COUNT],
}

impl SessionHandle {
    fn new(peer: Option<SocketAddr>, outbound: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            id: SessionId::new(),
            peer,
            outbound: Mutex::new(Some(outbound)),
            seqs: Default::default(),
            refreshing: Default::default(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Next sequence number for `kind`, starting at 1.
    pub fn next_seq(&self, kind: EntityKind) -> u64 {
        self.seqs[kind.index()].fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Queue a message for the transport.
    ///
    /// Returns `false` once the session has been released or its transport
    /// has gone away.
    pub fn push(&self, message: ServerMessage) -> bool {
        let outbound = self.outbound.lock().unwrap_or_else(PoisonError::into_inner);
        match outbound.as_ref() {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        }
    }

    /// True once released or the transport receiver is dropped.
    pub fn is_closed(&self) -> bool {
        let outbound = self.outbound.lock().unwrap_or_else(PoisonError::into_inner);
        outbound.as_ref().map_or(true, |tx| tx.is_closed())
    }

    /// Whether an on-demand refresh of `kind` is still running.
    pub fn refresh_in_flight(&self, kind: EntityKind) -> bool {
        self.refreshing[kind.index()].load(Ordering::SeqCst)
    }

    /// Claim the on-demand refresh slot for `kind`, or `None` if one is
    /// already running.
    pub(crate) fn try_begin_refresh(self: &Arc<Self>, kind: EntityKind) -> Option<RefreshGuard> {
        if self.refreshing[kind.index()].swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(RefreshGuard {
            session: Arc::clone(self),
            kind,
        })
    }

    fn close(&self) {
        let mut outbound = self.outbound.lock().unwrap_or_else(PoisonError::into_inner);
        outbound.take();
    }
}

/// Holds a session's refresh slot for one kind until dropped.
#[derive(Debug)]
pub(crate) struct RefreshGuard {
    session: Arc<SessionHandle>,
    kind: EntityKind,
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.session.refreshing[self.kind.index()].store(false, Ordering::SeqCst);
    }
}

struct SessionEntry {
    handle: Arc<SessionHandle>,
    timers: Vec<JoinHandle<()>>,
}

/// Counts a running timer task until dropped.
///
/// Moved into the timer future, so it is dropped whether the task returns or
/// is aborted.
#[derive(Debug)]
pub(crate) struct TimerGuard(Arc<AtomicUsize>);

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Registry of live sessions and their timers.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, SessionEntry>>,
    live_timers: Arc<AtomicUsize>,
    registered_total: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            live_timers: Arc::new(AtomicUsize::new(0)),
            registered_total: AtomicU64::new(0),
        }
    }

    /// Register a session whose pushes go to `outbound`.
    pub fn register(
        &self,
        peer: Option<SocketAddr>,
        outbound: mpsc::UnboundedSender<ServerMessage>,
    ) -> Arc<SessionHandle> {
        let handle = Arc::new(SessionHandle::new(peer, outbound));
        let entry = SessionEntry {
            handle: Arc::clone(&handle),
            timers: Vec::new(),
        };
        self.lock().insert(handle.id(), entry);
        self.registered_total.fetch_add(1, Ordering::Relaxed);
        debug!(session = %handle.id(), "Session registered");
        handle
    }

    /// Hand timer tasks over to the session.
    ///
    /// If the session was released in the meantime the timers are aborted
    /// right away and `false` is returned.
    pub fn attach_timers(&self, id: SessionId, timers: Vec<JoinHandle<()>>) -> bool {
        let mut sessions = self.lock();
        match sessions.get_mut(&id) {
            Some(entry) => {
                entry.timers.extend(timers);
                true
            }
            None => {
                drop(sessions);
                for timer in timers {
                    timer.abort();
                }
                false
            }
        }
    }

    /// Release a session: close its outbound channel and abort its timers.
    ///
    /// Returns `false` if the session was unknown or already released.
    pub fn release(&self, id: SessionId) -> bool {
        let Some(entry) = self.lock().remove(&id) else {
            return false;
        };

        entry.handle.close();
        let timers = entry.timers.len();
        for timer in entry.timers {
            timer.abort();
        }

        debug!(session = %id, timers, "Session released");
        true
    }

    /// Release every session. Returns how many were released.
    pub fn release_all(&self) -> usize {
        let ids: Vec<SessionId> = self.lock().keys().copied().collect();
        ids.into_iter().filter(|id| self.release(*id)).count()
    }

    pub fn get(&self, id: SessionId) -> Option<Arc<SessionHandle>> {
        self.lock().get(&id).map(|entry| Arc::clone(&entry.handle))
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn session_count(&self) -> usize {
        self.lock().len()
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.lock().keys().copied().collect()
    }

    /// Timer tasks still running, across all sessions.
    pub fn live_timers(&self) -> usize {
        self.live_timers.load(Ordering::SeqCst)
    }

    /// Sessions registered since start.
    pub fn registered_total(&self) -> u64 {
        self.registered_total.load(Ordering::Relaxed)
    }

    pub(crate) fn timer_guard(&self) -> TimerGuard {
        self.live_timers.fetch_add(1, Ordering::SeqCst);
        TimerGuard(Arc::clone(&self.live_timers))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use telemetry_core::wire::Snapshot;

    fn message() -> ServerMessage {
        Snapshot::Trades(Vec::new()).into_message(1, Utc::now())
    }

    #[test]
    fn test_register_and_release() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = registry.register(None, tx);

        assert_eq!(registry.session_count(), 1);
        assert!(registry.contains(session.id()));
        assert!(registry.release(session.id()));
        assert_eq!(registry.session_count(), 0);
        assert!(session.is_closed());
    }

    #[test]
    fn test_release_is_idempotent() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = registry.register(None, tx);

        assert!(registry.release(session.id()));
        assert!(!registry.release(session.id()));
        assert!(!registry.release(SessionId::new()));
    }

    #[test]
    fn test_push_refused_after_release() {
        let registry = SessionRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = registry.register(None, tx);

        assert!(session.push(message()));
        registry.release(session.id());
        assert!(!session.push(message()));

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_push_refused_when_transport_gone() {
        let registry = SessionRegistry::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let session = registry.register(None, tx);

        drop(rx);
        assert!(session.is_closed());
        assert!(!session.push(message()));
    }

    #[test]
    fn test_seq_is_per_kind() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = registry.register(None, tx);

        assert_eq!(session.next_seq(EntityKind::Trades), 1);
        assert_eq!(session.next_seq(EntityKind::Trades), 2);
        assert_eq!(session.next_seq(EntityKind::Signals), 1);
        assert_eq!(session.next_seq(EntityKind::Trades), 3);
    }

    #[tokio::test]
    async fn test_attach_after_release_aborts_timers() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = registry.register(None, tx);
        registry.release(session.id());

        let guard = registry.timer_guard();
        let timer = tokio::spawn(async move {
            let _guard = guard;
            std::future::pending::<()>().await;
        });
        assert_eq!(registry.live_timers(), 1);

        assert!(!registry.attach_timers(session.id(), vec![timer]));
        tokio::task::yield_now().await;
        for _ in 0..10 {
            if registry.live_timers() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(registry.live_timers(), 0);
    }

    #[test]
    fn test_release_all() {
        let registry = SessionRegistry::new();
        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (tx, rx) = mpsc::unbounded_channel();
            registry.register(None, tx);
            receivers.push(rx);
        }

        assert_eq!(registry.release_all(), 3);
        assert_eq!(registry.session_count(), 0);
        assert_eq!(registry.registered_total(), 3);
    }
}
