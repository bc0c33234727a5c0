//! Error types for the SwaggerSocket client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use swaggersocket_client::{Request, Result, SwaggerSocket};
//!
//! fn example(socket: &SwaggerSocket, request: Request) -> Result<()> {
//!     socket.send(request)?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Transport | [`Error::TransportUnavailable`], [`Error::Transport`], [`Error::ReconnectExhausted`] |
//! | Connection | [`Error::ConnectionClosed`], [`Error::ConnectionTimeout`], [`Error::InvalidEndpoint`] |
//! | Protocol | [`Error::DecodeMalformed`], [`Error::UnmatchedResponse`], [`Error::PrematureSend`], [`Error::RequestFailed`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Http`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::RequestId;
use crate::transport::TransportKind;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Requested transport is not usable in this runtime or against this
    /// endpoint.
    ///
    /// Internal: the connection manager reacts by substituting the
    /// configured fallback transport. Surfaced only when no eligible
    /// fallback remains.
    #[error("Transport unavailable: {kind}")]
    TransportUnavailable {
        /// The transport that could not be used.
        kind: TransportKind,
    },

    /// Transport-level I/O failure.
    ///
    /// Retried up to the configured reconnect ceiling before surfacing.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the I/O failure.
        message: String,
    },

    /// Reconnect ceiling exceeded.
    ///
    /// Terminal: surfaced exactly once, after which no further reconnect
    /// attempt is made.
    #[error("Reconnect maximum try reached: {attempts}")]
    ReconnectExhausted {
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Connection closed.
    ///
    /// Returned when an operation is attempted against a torn-down
    /// connection.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Connection timeout.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Endpoint URL is invalid or uses an unsupported scheme.
    #[error("Invalid endpoint: {message}")]
    InvalidEndpoint {
        /// Description of the problem with the endpoint.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Payload could not be decoded as a protocol envelope.
    ///
    /// Distinct from an incomplete payload, which is held in the reassembly
    /// buffer and is not an error. Surfaced through the error listener; the
    /// buffer is discarded.
    #[error("Malformed protocol payload: {message}")]
    DecodeMalformed {
        /// Description of the decode failure.
        message: String,
    },

    /// Send attempted before the handshake ack was observed.
    ///
    /// Rejected synchronously; the request is never registered.
    #[error("The open operation has not completed yet; wait for on_open before sending")]
    PrematureSend,

    /// Response carried a uuid with no matching pending request.
    ///
    /// Delivered to the error listener rather than dropped.
    #[error("Response {uuid} has no matching pending request")]
    UnmatchedResponse {
        /// The unmatched response uuid.
        uuid: RequestId,
    },

    /// Server reported an error status (400 and above) for a request.
    ///
    /// Dispatched to the error listener together with the full response.
    #[error("Request failed with status {status}: {reason_phrase}")]
    RequestFailed {
        /// Response status code.
        status: u16,
        /// Human-readable status text.
        reason_phrase: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a transport-unavailable error.
    #[inline]
    pub const fn transport_unavailable(kind: TransportKind) -> Self {
        Self::TransportUnavailable { kind }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a reconnect-exhausted error.
    #[inline]
    pub const fn reconnect_exhausted(attempts: u32) -> Self {
        Self::ReconnectExhausted { attempts }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub const fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates an invalid endpoint error.
    #[inline]
    pub fn invalid_endpoint(message: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            message: message.into(),
        }
    }

    /// Creates a malformed-payload error.
    #[inline]
    pub fn decode_malformed(message: impl Into<String>) -> Self {
        Self::DecodeMalformed {
            message: message.into(),
        }
    }

    /// Creates an unmatched-response error.
    #[inline]
    pub const fn unmatched_response(uuid: RequestId) -> Self {
        Self::UnmatchedResponse { uuid }
    }

    /// Creates a request-failed error from a response status line.
    #[inline]
    pub fn request_failed(status: u16, reason_phrase: impl Into<String>) -> Self {
        Self::RequestFailed {
            status,
            reason_phrase: reason_phrase.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a transport or connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::TransportUnavailable { .. }
                | Self::ConnectionClosed
                | Self::ConnectionTimeout { .. }
                | Self::ReconnectExhausted { .. }
                | Self::WebSocket(_)
                | Self::Http(_)
        )
    }

    /// Returns `true` if this is a protocol-level error.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::DecodeMalformed { .. }
                | Self::UnmatchedResponse { .. }
                | Self::PrematureSend
                | Self::RequestFailed { .. }
        )
    }

    /// Returns `true` if this error is terminal for the session.
    ///
    /// Terminal errors are surfaced exactly once; non-terminal errors may be
    /// followed by further traffic on the same session.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ReconnectExhausted { .. } | Self::ConnectionClosed
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
