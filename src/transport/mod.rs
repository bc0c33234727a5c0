//! Transport layer: pluggable delivery mechanisms under one connection
//! manager.
//!
//! A [`Transport`] moves opaque text payloads between client and server and
//! reports its lifecycle through [`TransportEvent`]s. The
//! [`ConnectionManager`] owns exactly one live transport at a time, walks
//! the fallback chain when a kind is unavailable, reconnects within the
//! configured ceiling, and reassembles fragmented payloads into complete
//! protocol envelopes.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `config` | Transport kinds, fallback chain, connection configuration |
//! | `manager` | Connection state machine, reconnection, reassembly |
//! | `websocket` | Persistent full-duplex socket transport |
//! | `http` | Chunked streaming, long-poll and cross-domain poll transports |

// ============================================================================
// Submodules
// ============================================================================

/// Transport kinds and connection configuration.
pub mod config;

/// Chunked streaming, long-poll and cross-domain poll transports.
pub mod http;

/// Connection state machine, reconnection and reassembly.
pub mod manager;

/// Persistent socket transport.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{
    DEFAULT_MAX_REQUEST, DEFAULT_MAX_STREAMING_LENGTH, DEFAULT_TIMEOUT, TransportConfig,
    TransportKind,
};
pub use http::{ChunkedStreamTransport, CrossDomainPollTransport, LongPollTransport};
pub use manager::{ConnectionEvent, ConnectionManager, ConnectionState};
pub use websocket::WebSocketTransport;

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

// ============================================================================
// TransportEvent
// ============================================================================

/// Lifecycle and data notifications emitted by a live transport.
///
/// Delivered in order on the per-connection event channel; `Closed` and
/// `Error` are terminal for the transport that emitted them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The transport is established and ready to carry payloads.
    Opened,

    /// An inbound payload fragment. Fragments are reassembled by the
    /// connection manager, not here.
    Data(String),

    /// The transport closed (peer close or natural end of stream).
    Closed,

    /// The transport failed.
    Error(String),
}

// ============================================================================
// Transport
// ============================================================================

/// One live delivery mechanism.
///
/// Implementations emit [`TransportEvent`]s on the channel handed to their
/// factory and must stop emitting after `close` returns.
#[async_trait]
pub trait Transport: Send {
    /// The kind this transport implements.
    fn kind(&self) -> TransportKind;

    /// Sends one payload to the server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`](crate::Error::Transport) if the write
    /// fails; the caller treats this as a transport loss.
    async fn send(&mut self, payload: String) -> Result<()>;

    /// Closes the transport. Idempotent.
    async fn close(&mut self);
}

// ============================================================================
// TransportFactory
// ============================================================================

/// Builds live transports for the connection manager.
///
/// The seam that lets tests drive the manager with scripted transports.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Establishes a transport of `kind` against `config.endpoint`.
    ///
    /// `initial_payload` is the first client message (the handshake, or a
    /// re-sent handshake on reconnect). HTTP-style kinds carry it in their
    /// opening request; the persistent socket ignores it here and the
    /// manager writes it once `Opened` is observed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransportUnavailable`](crate::Error::TransportUnavailable)
    /// when the kind cannot be established at all, which triggers fallback;
    /// any other error aborts the connection attempt.
    async fn connect(
        &self,
        kind: TransportKind,
        config: &TransportConfig,
        initial_payload: Option<String>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Box<dyn Transport>>;
}

// ============================================================================
// NetTransportFactory
// ============================================================================

/// Default factory backed by real network transports.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetTransportFactory;

impl NetTransportFactory {
    /// Creates the default factory.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransportFactory for NetTransportFactory {
    async fn connect(
        &self,
        kind: TransportKind,
        config: &TransportConfig,
        initial_payload: Option<String>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Box<dyn Transport>> {
        match kind {
            TransportKind::WebSocket => {
                let transport = WebSocketTransport::connect(config, events).await?;
                Ok(Box::new(transport))
            }
            TransportKind::ChunkedStream => {
                let transport =
                    ChunkedStreamTransport::connect(config, initial_payload, events).await?;
                Ok(Box::new(transport))
            }
            TransportKind::LongPoll => {
                let transport =
                    LongPollTransport::connect(config, initial_payload, events).await?;
                Ok(Box::new(transport))
            }
            TransportKind::CrossDomainPoll => {
                let transport =
                    CrossDomainPollTransport::connect(config, initial_payload, events).await?;
                Ok(Box::new(transport))
            }
        }
    }
}

// ============================================================================
// Test Support
// ============================================================================
