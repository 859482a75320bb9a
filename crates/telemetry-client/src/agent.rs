//! Sync agent: one connection to the telemetry server with automatic
//! reconnection.

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use telemetry_core::error::TransportError;
use telemetry_core::types::EntityKind;
use telemetry_core::wire::{ClientMessage, ServerMessage};
use telemetry_metrics::MetricsConfig;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, trace, warn};

use crate::mirror::{ApplyOutcome, Mirror};

/// Delay between reconnection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconnectPolicy {
    /// Same delay after every failure.
    Fixed { delay_ms: u64 },
    /// Doubles per consecutive failure up to `max_ms`; reset once connected.
    Exponential { initial_ms: u64, max_ms: u64 },
}

impl ReconnectPolicy {
    /// Delay before the next attempt, given how many consecutive attempts
    /// have already failed.
    pub fn delay(&self, failures: u32) -> Duration {
        let ms = match *self {
            ReconnectPolicy::Fixed { delay_ms } => delay_ms,
            ReconnectPolicy::Exponential { initial_ms, max_ms } => initial_ms
                .saturating_mul(2u64.saturating_pow(failures))
                .min(max_ms),
        };
        Duration::from_millis(ms)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::Fixed { delay_ms: 3000 }
    }
}

/// Sync agent configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server WebSocket URL
    pub url: String,
    pub reconnect: ReconnectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:3001".to_string(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Command {
    Refresh(EntityKind),
}

/// Handle to a running sync agent.
///
/// Dropping the handle aborts the agent; [`SyncHandle::shutdown`] stops it
/// and waits for it to finish.
pub struct SyncHandle {
    mirror: watch::Receiver<Mirror>,
    commands: mpsc::UnboundedSender<Command>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SyncHandle {
    /// Current mirror value.
    pub fn mirror(&self) -> Mirror {
        self.mirror.borrow().clone()
    }

    /// A receiver notified on every mirror change.
    pub fn subscribe(&self) -> watch::Receiver<Mirror> {
        self.mirror.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.mirror.borrow().is_connected()
    }

    /// Ask the server for a fresh snapshot of `kind`.
    ///
    /// Dropped while disconnected.
    pub fn refresh(&self, kind: EntityKind) {
        let _ = self.commands.send(Command::Refresh(kind));
    }

    /// Ask for a fresh snapshot of every kind.
    pub fn refresh_all(&self) {
        for kind in EntityKind::ALL {
            self.refresh(kind);
        }
    }

    /// Stop the agent, closing the connection or cancelling a pending
    /// reconnect.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Owns the transport and the mirror.
pub struct SyncAgent {
    config: ClientConfig,
    mirror: watch::Sender<Mirror>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl SyncAgent {
    /// Start an agent on the current runtime.
    pub fn spawn(config: ClientConfig, metrics: &MetricsConfig) -> SyncHandle {
        let (mirror_tx, mirror_rx) = watch::channel(Mirror::new(metrics));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let agent = SyncAgent {
            config,
            mirror: mirror_tx,
            commands: command_rx,
        };
        let task = tokio::spawn(agent.run(shutdown_rx));

        SyncHandle {
            mirror: mirror_rx,
            commands: command_tx,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        let mut failures: u32 = 0;

        'agent: loop {
            let result = tokio::select! {
                _ = &mut shutdown => break 'agent,
                result = self.connect_and_listen(&mut failures) => result,
            };

            match result {
                Ok(()) => info!("Server closed the connection"),
                Err(e) => warn!(error = %e, "Connection to telemetry server lost"),
            }
            self.mark_disconnected();

            let delay = self.config.reconnect.delay(failures);
            failures = failures.saturating_add(1);
            info!(delay_ms = delay.as_millis() as u64, failures, "Reconnecting");

            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = &mut shutdown => break 'agent,
                    _ = &mut sleep => break,
                    Some(command) = self.commands.recv() => Self::drop_command(command),
                }
            }
        }

        self.mark_disconnected();
        info!("Sync agent stopped");
    }

    async fn connect_and_listen(&mut self, failures: &mut u32) -> Result<(), TransportError> {
        info!(url = %self.config.url, "Connecting to telemetry server");

        let (ws_stream, _) = connect_async(self.config.url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (mut write, mut read) = ws_stream.split();

        *failures = 0;
        while let Ok(command) = self.commands.try_recv() {
            Self::drop_command(command);
        }
        self.mirror.send_modify(Mirror::mark_connected);
        info!("Connected to telemetry server");

        loop {
            tokio::select! {
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.handle_frame(&text),
                    Some(Ok(Message::Ping(data))) => {
                        write
                            .send(Message::Pong(data))
                            .await
                            .map_err(|e| TransportError::WebSocket(e.to_string()))?;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "Close frame received");
                        return Ok(());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(TransportError::WebSocket(e.to_string())),
                    None => return Err(TransportError::Closed),
                },
                Some(command) = self.commands.recv() => {
                    let Command::Refresh(kind) = command;
                    let request = match ClientMessage::refresh(kind).to_json() {
                        Ok(json) => json,
                        Err(e) => {
                            warn!(%kind, error = %e, "Failed to encode refresh request");
                            continue;
                        }
                    };
                    write
                        .send(Message::Text(request))
                        .await
                        .map_err(|e| TransportError::WebSocket(e.to_string()))?;
                    debug!(%kind, "Refresh requested");
                }
            }
        }
    }

    fn handle_frame(&self, text: &str) {
        let message = match ServerMessage::from_json(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed server message");
                return;
            }
        };

        let kind = message.kind();
        let seq = message.seq();
        let mut outcome = ApplyOutcome::Unchanged;
        self.mirror.send_if_modified(|mirror| {
            outcome = mirror.apply(message);
            outcome == ApplyOutcome::Applied
        });

        match outcome {
            ApplyOutcome::Stale => debug!(%kind, seq, "Discarded stale push"),
            _ => trace!(%kind, seq, ?outcome, "Push applied"),
        }
    }

    fn mark_disconnected(&self) {
        self.mirror.send_if_modified(|mirror| {
            let was_connected = mirror.is_connected();
            mirror.mark_disconnected();
            was_connected
        });
    }

    fn drop_command(command: Command) {
        let Command::Refresh(kind) = command;
        debug!(%kind, "Not connected, dropping refresh request");
    }
}
