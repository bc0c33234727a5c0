//! Connection manager: one live transport, fallback, reconnection and
//! payload reassembly.
//!
//! The manager runs as a spawned task owning the live transport. Callers
//! interact through a command channel (send/close) and observe the
//! connection through an ordered [`ConnectionEvent`] stream.
//!
//! # State Machine
//!
//! ```text
//! Idle -> Opening -> Streaming <-> Reconnecting
//!                        |               |
//!                      Closed          Failed
//! ```
//!
//! Reconnection is bounded by the configured ceiling; the counter is never
//! reset, so a session's total tolerance for transport loss is fixed at
//! open time. Crossing the ceiling emits [`ConnectionEvent::Failed`]
//! exactly once.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::protocol::{DecodeOutcome, DecodedMessage, decode_envelope};

use super::config::{TransportConfig, TransportKind};
use super::{Transport, TransportEvent, TransportFactory};

// ============================================================================
// ConnectionState
// ============================================================================

/// Observable lifecycle of the managed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not yet opened.
    Idle,
    /// A transport is being established (fallback walk included).
    Opening,
    /// A transport is live and carrying traffic.
    Streaming,
    /// The transport was lost; a reconnect attempt is in progress.
    Reconnecting,
    /// Closed deliberately. Terminal.
    Closed,
    /// Gave up: fallback chain or reconnect ceiling exhausted. Terminal.
    Failed,
}

// ============================================================================
// ConnectionEvent
// ============================================================================

/// Ordered notifications from the connection manager.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// A transport is established and carrying traffic.
    Opened {
        /// The kind that was established.
        transport: TransportKind,
    },

    /// The requested kind was unavailable and a fallback was substituted.
    Downgraded {
        /// The kind that could not be used.
        from: TransportKind,
        /// The kind tried instead.
        to: TransportKind,
    },

    /// A complete protocol envelope was reassembled and decoded.
    Message(DecodedMessage),

    /// An inbound payload could not be decoded; the reassembly buffer was
    /// discarded.
    DecodeFailed(String),

    /// The transport was lost and a reconnect attempt is starting. Payloads
    /// handed to the lost transport are not replayed; work in flight should
    /// be treated as undeliverable.
    Reconnecting {
        /// 1-based reconnect attempt number.
        attempt: u32,
    },

    /// The connection closed deliberately. Terminal.
    Closed,

    /// The connection gave up. Terminal, emitted exactly once.
    Failed(Error),
}

// ============================================================================
// Commands
// ============================================================================

enum Command {
    Send(String),
    Close,
}

// ============================================================================
// ConnectionManager
// ============================================================================

/// Handle to the connection task.
///
/// Cheap to clone; all clones drive the same underlying connection.
#[derive(Clone)]
pub struct ConnectionManager {
    command_tx: mpsc::UnboundedSender<Command>,
    state: Arc<Mutex<ConnectionState>>,
}

impl ConnectionManager {
    /// Opens a managed connection and returns the handle plus the ordered
    /// event stream.
    ///
    /// `initial_payload` is the first client message (the handshake). It is
    /// delivered through the opening request for HTTP-style transports and
    /// written immediately after establishment for the persistent socket;
    /// on every reconnect it is delivered again the same way.
    #[must_use]
    pub fn open(
        config: TransportConfig,
        factory: Arc<dyn TransportFactory>,
        initial_payload: String,
    ) -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(ConnectionState::Idle));

        tokio::spawn(run_loop(
            config,
            factory,
            initial_payload,
            command_rx,
            event_tx,
            Arc::clone(&state),
        ));

        (Self { command_tx, state }, event_rx)
    }

    /// Current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Queues one payload for the live transport.
    ///
    /// Returns as soon as the payload is handed to the connection task;
    /// delivery is asynchronous.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the connection task has
    /// terminated.
    pub fn send(&self, payload: String) -> Result<()> {
        self.command_tx
            .send(Command::Send(payload))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Closes the connection deliberately. Idempotent.
    pub fn close(&self) {
        let _ = self.command_tx.send(Command::Close);
    }
}

// ============================================================================
// Connection Task
// ============================================================================

fn set_state(state: &Mutex<ConnectionState>, next: ConnectionState) {
    *state.lock() = next;
}

async fn run_loop(
    config: TransportConfig,
    factory: Arc<dyn TransportFactory>,
    initial_payload: String,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
    event_tx: mpsc::UnboundedSender<ConnectionEvent>,
    state: Arc<Mutex<ConnectionState>>,
) {
    let mut reassembly = String::new();
    let mut attempts: u32 = 0;
    // after a downgrade, reconnects stay on the kind that worked
    let mut current_kind = config.transport;

    loop {
        set_state(&state, ConnectionState::Opening);

        let (transport_tx, mut transport_rx) = mpsc::unbounded_channel();
        let connected = connect_with_fallback(
            &config,
            factory.as_ref(),
            current_kind,
            Some(initial_payload.clone()),
            transport_tx,
            &event_tx,
        )
        .await;

        let mut transport = match connected {
            Ok(transport) => transport,
            Err(e) => {
                set_state(&state, ConnectionState::Failed);
                let _ = event_tx.send(ConnectionEvent::Failed(e));
                return;
            }
        };
        current_kind = transport.kind();

        // fresh buffer per transport: fragments never span connections
        reassembly.clear();

        let mut lost = false;
        loop {
            tokio::select! {
                event = transport_rx.recv() => match event {
                    Some(TransportEvent::Opened) => {
                        set_state(&state, ConnectionState::Streaming);
                        info!(transport = %current_kind, "connection established");
                        let _ = event_tx.send(ConnectionEvent::Opened { transport: current_kind });

                        // send-on-connect: the socket has no opening
                        // request to carry the handshake
                        if current_kind == TransportKind::WebSocket {
                            if let Err(e) = transport.send(initial_payload.clone()).await {
                                warn!(error = %e, "initial payload write failed");
                                lost = true;
                                break;
                            }
                        }
                    }
                    Some(TransportEvent::Data(chunk)) => {
                        handle_chunk(&mut reassembly, &chunk, config.max_streaming_length, &event_tx);
                    }
                    Some(TransportEvent::Closed) | None => {
                        warn!(transport = %current_kind, "transport lost");
                        lost = true;
                        break;
                    }
                    Some(TransportEvent::Error(message)) => {
                        warn!(transport = %current_kind, error = %message, "transport error");
                        lost = true;
                        break;
                    }
                },
                command = command_rx.recv() => match command {
                    Some(Command::Send(payload)) => {
                        if let Err(e) = transport.send(payload).await {
                            warn!(error = %e, "send failed, treating transport as lost");
                            lost = true;
                            break;
                        }
                    }
                    Some(Command::Close) | None => {
                        transport.close().await;
                        set_state(&state, ConnectionState::Closed);
                        let _ = event_tx.send(ConnectionEvent::Closed);
                        return;
                    }
                },
            }
        }

        debug_assert!(lost);
        transport.close().await;

        if attempts >= config.max_request {
            set_state(&state, ConnectionState::Failed);
            let _ = event_tx.send(ConnectionEvent::Failed(Error::reconnect_exhausted(attempts)));
            return;
        }
        attempts += 1;
        set_state(&state, ConnectionState::Reconnecting);
        debug!(attempt = attempts, ceiling = config.max_request, "reconnecting");
        let _ = event_tx.send(ConnectionEvent::Reconnecting { attempt: attempts });
    }
}

// ============================================================================
// Fallback Walk
// ============================================================================

/// Tries `start` and, on unavailability, walks the downgrade chain:
/// configured fallback first, then each kind's successor.
async fn connect_with_fallback(
    config: &TransportConfig,
    factory: &dyn TransportFactory,
    start: TransportKind,
    initial_payload: Option<String>,
    transport_tx: mpsc::UnboundedSender<TransportEvent>,
    event_tx: &mpsc::UnboundedSender<ConnectionEvent>,
) -> Result<Box<dyn Transport>> {
    let mut kind = start;
    loop {
        match factory
            .connect(kind, config, initial_payload.clone(), transport_tx.clone())
            .await
        {
            Ok(transport) => return Ok(transport),
            Err(Error::TransportUnavailable { .. }) => {
                let next = if kind == config.transport && config.fallback != kind {
                    Some(config.fallback)
                } else {
                    kind.fallback()
                };
                match next {
                    Some(next) => {
                        warn!(from = %kind, to = %next, "transport unavailable, downgrading");
                        let _ = event_tx.send(ConnectionEvent::Downgraded { from: kind, to: next });
                        kind = next;
                    }
                    None => return Err(Error::transport_unavailable(kind)),
                }
            }
            Err(e) => return Err(e),
        }
    }
}

// ============================================================================
// Reassembly
// ============================================================================

/// Accumulates one chunk and attempts a decode, emitting the result.
fn handle_chunk(
    reassembly: &mut String,
    chunk: &str,
    max_buffer: usize,
    event_tx: &mpsc::UnboundedSender<ConnectionEvent>,
) {
    reassembly.push_str(chunk);

    if reassembly.len() > max_buffer {
        warn!(bytes = reassembly.len(), "reassembly buffer overflow, discarding");
        reassembly.clear();
        let _ = event_tx.send(ConnectionEvent::DecodeFailed(
            "reassembly buffer exceeded the streaming byte ceiling".to_string(),
        ));
        return;
    }

    match decode_envelope(reassembly) {
        DecodeOutcome::Complete(message) => {
            reassembly.clear();
            let _ = event_tx.send(ConnectionEvent::Message(message));
        }
        DecodeOutcome::Incomplete => {
            // wait for the next fragment
        }
        DecodeOutcome::Malformed(message) => {
            warn!(error = %message, "malformed payload discarded");
            reassembly.clear();
            let _ = event_tx.send(ConnectionEvent::DecodeFailed(message));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
