//! WebSocket transport for the broadcaster.
//!
//! ## Features
//!
//! - One task per session, owning both halves of the socket
//! - Initial sync on connect, then per-kind timers
//! - Viewer refresh requests answered out of cadence
//! - Slow viewers dropped after the send timeout
//! - Session slots reserved before the handshake, which is itself timed out
//! - Graceful shutdown releasing every session

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use telemetry_core::error::{TelemetryResult, TransportError};
use telemetry_core::traits::StoreReader;
use telemetry_core::wire::{ClientMessage, ServerMessage};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::protocol::Message, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::broadcaster::{Broadcaster, ServerStats};
use crate::config::ServerConfig;
use crate::registry::{SessionHandle, SessionRegistry};

/// WebSocket server pushing store snapshots to viewers.
pub struct TelemetryServer {
    broadcaster: Broadcaster,
    slots: Arc<Semaphore>,
    shutdown_tx: broadcast::Sender<()>,
}

impl TelemetryServer {
    pub fn new(config: ServerConfig, store: Arc<dyn StoreReader>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let slots = Arc::new(Semaphore::new(config.max_sessions.min(Semaphore::MAX_PERMITS)));

        Self {
            broadcaster: Broadcaster::new(store, config),
            slots,
            shutdown_tx,
        }
    }

    /// Session slots not held by a connected or handshaking peer.
    pub fn open_slots(&self) -> usize {
        self.slots.available_permits()
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        self.broadcaster.registry()
    }

    pub fn stats(&self) -> &Arc<ServerStats> {
        self.broadcaster.stats()
    }

    /// Get the shutdown sender for triggering graceful shutdown.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> TelemetryResult<TcpListener> {
        let listener = TcpListener::bind(&self.broadcaster.config().bind).await?;
        Ok(listener)
    }

    /// Bind and serve until shutdown is triggered.
    pub async fn run(&self) -> TelemetryResult<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Serve connections from `listener` until shutdown is triggered.
    pub async fn serve(&self, listener: TcpListener) -> TelemetryResult<()> {
        let config = self.broadcaster.config();
        info!(
            addr = %listener.local_addr()?,
            max_sessions = config.max_sessions,
            store = self.broadcaster.store_name(),
            "Telemetry server started"
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, addr)) => self.handle_new_connection(stream, addr),
                        Err(e) => error!(error = %e, "Failed to accept connection"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Telemetry server shutting down");
                    break;
                }
            }
        }

        let released = self.registry().release_all();
        info!(released, "Telemetry server stopped");
        Ok(())
    }

    /// Handle a new incoming connection.
    ///
    /// The session slot is taken before the handshake starts and held until
    /// the session task ends, so handshakes in flight count against the limit.
    fn handle_new_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let max = self.broadcaster.config().max_sessions;
        let Ok(slot) = Arc::clone(&self.slots).try_acquire_owned() else {
            self.stats().connections_rejected.fetch_add(1, Ordering::Relaxed);
            warn!(
                addr = %addr,
                sessions = self.registry().session_count(),
                max,
                "Rejecting connection: max sessions reached"
            );
            return;
        };

        let broadcaster = self.broadcaster.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            let _slot = slot;
            let handshake_timeout = broadcaster.config().send_timeout();
            let ws_stream = match timeout(handshake_timeout, accept_async(stream)).await {
                Ok(Ok(ws)) => ws,
                Ok(Err(e)) => {
                    warn!(addr = %addr, error = %e, "WebSocket handshake failed");
                    return;
                }
                Err(_) => {
                    warn!(
                        addr = %addr,
                        timeout_ms = handshake_timeout.as_millis() as u64,
                        "WebSocket handshake timed out"
                    );
                    return;
                }
            };
            broadcaster
                .stats()
                .connections_accepted
                .fetch_add(1, Ordering::Relaxed);

            let (tx, rx) = mpsc::unbounded_channel::<ServerMessage>();
            let session = broadcaster.registry().register(Some(addr), tx);
            info!(session = %session.id(), addr = %addr, "Session connected");

            let sync = {
                let broadcaster = broadcaster.clone();
                let session = Arc::clone(&session);
                tokio::spawn(async move { broadcaster.on_connect(&session).await })
            };

            session_task(&broadcaster, &session, ws_stream, rx, shutdown_rx).await;

            broadcaster.on_disconnect(session.id());
            sync.abort();
            info!(session = %session.id(), "Session disconnected");
        });
    }
}

/// Task that handles a single session's socket.
async fn session_task(
    broadcaster: &Broadcaster,
    session: &Arc<SessionHandle>,
    ws_stream: WebSocketStream<TcpStream>,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let id = session.id();
    let send_timeout: Duration = broadcaster.config().send_timeout();
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    loop {
        tokio::select! {
            outgoing = rx.recv() => {
                let Some(message) = outgoing else {
                    debug!(session = %id, "Session released");
                    break;
                };
                let json = match message.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        error!(session = %id, kind = %message.kind(), error = %e, "Failed to encode push");
                        continue;
                    }
                };
                match timeout(send_timeout, ws_tx.send(Message::Text(json))).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        debug!(session = %id, error = %e, "Failed to send message");
                        break;
                    }
                    Err(_) => {
                        broadcaster.stats().send_timeouts.fetch_add(1, Ordering::Relaxed);
                        let err = TransportError::Timeout {
                            timeout_ms: send_timeout.as_millis() as u64,
                        };
                        warn!(session = %id, error = %err, "Dropping slow session");
                        break;
                    }
                }
            }
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => match ClientMessage::from_json(&text) {
                        Ok(request) => {
                            broadcaster.on_demand_refresh(session, request.kind());
                        }
                        Err(e) => {
                            broadcaster.stats().malformed_messages.fetch_add(1, Ordering::Relaxed);
                            warn!(session = %id, error = %e, "Ignoring malformed client message");
                        }
                    },
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = ws_tx.send(Message::Pong(data)).await {
                            debug!(session = %id, error = %e, "Failed to send pong");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!(session = %id, "Client requested close");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!(session = %id, error = %e, "WebSocket error");
                        break;
                    }
                    None => {
                        debug!(session = %id, "Connection closed");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
            _ = shutdown_rx.recv() => {
                debug!(session = %id, "Shutdown signal received");
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }
        }
    }
}
