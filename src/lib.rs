//! Multiplexing SwaggerSocket protocol client with transport fallback.
//!
//! This crate multiplexes many logical request/response exchanges over one
//! long-lived connection. A session opens with a handshake, receives a
//! server-assigned identity, and from then on batches requests onto the
//! shared wire, correlating responses back by uuid and routing them to
//! listener callbacks.
//!
//! The connection underneath is managed: when the preferred transport is
//! unavailable the client walks a fallback chain (persistent socket,
//! chunked streaming, long-poll, cross-domain poll), and when a live
//! transport is lost it reconnects within a bounded ceiling, re-sending
//! the handshake each time.
//!
//! # Quick Start
//!
//! ```no_run
//! use swaggersocket_client::{
//!     Handshake, Listener, Request, Result, SwaggerSocket, TransportConfig,
//! };
//! use url::Url;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = TransportConfig::new(Url::parse("http://localhost:8080/swagger").unwrap());
//!     let handshake = Handshake::new().with_path("/swagger");
//!
//!     let listener = Listener::new()
//!         .on_open(|ack| println!("session open: {}", ack.status))
//!         .on_response(|response| println!("response: {}", response.message_body))
//!         .on_error(|error, _response| eprintln!("error: {error}"));
//!
//!     let socket = SwaggerSocket::open(config, handshake, listener)?;
//!
//!     // ... once on_open has fired:
//!     socket.send(Request::new().with_path("/pet").with_body("{}"))?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`identifiers`] | Type-safe request and session identifiers |
//! | [`protocol`] | Message types and the incremental wire codec |
//! | [`transport`] | Pluggable transports, fallback, reconnection, reassembly |
//! | [`session`] | The multiplexer, listeners and the socket registry |
//! | [`error`] | Crate-wide error type |

// ============================================================================
// Modules
// ============================================================================

/// Error types for the crate.
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Protocol message types and wire codec.
pub mod protocol;

/// Session multiplexer, listeners and registry.
pub mod session;

/// Transport layer: delivery mechanisms and connection management.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use identifiers::{Identity, RequestId};
pub use protocol::{Handshake, Header, Request, Response};
pub use session::{Listener, SessionPhase, SocketId, SocketRegistry, SwaggerSocket};
pub use transport::{
    ConnectionEvent, ConnectionManager, ConnectionState, NetTransportFactory, Transport,
    TransportConfig, TransportEvent, TransportFactory, TransportKind,
};
