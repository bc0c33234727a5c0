//! Transport selection and connection configuration.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use url::Url;

// ============================================================================
// Constants
// ============================================================================

/// Default reconnect ceiling (attempts before a terminal failure).
pub const DEFAULT_MAX_REQUEST: u32 = 60;

/// Default byte ceiling for a streaming response before the transport is
/// cycled to bound memory.
pub const DEFAULT_MAX_STREAMING_LENGTH: usize = 10_000_000;

/// Default idle/suspend timeout for poll-style transports.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

// ============================================================================
// TransportKind
// ============================================================================

/// The underlying delivery mechanism for a connection.
///
/// Kinds form a downgrade chain: when a kind cannot be used, the manager
/// substitutes the configured fallback and, past that, walks
/// [`TransportKind::fallback`] until a usable kind remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Persistent full-duplex socket.
    WebSocket,
    /// Chunked HTTP streaming; one suspended response delivers many chunks.
    ChunkedStream,
    /// Long-polling; each completed response is immediately re-requested.
    LongPoll,
    /// Cross-domain polling; single-shot exchange per call, payload carried
    /// on the query string.
    CrossDomainPoll,
}

impl TransportKind {
    /// Returns the next kind in the downgrade chain, or `None` when no
    /// eligible fallback remains.
    #[inline]
    #[must_use]
    pub const fn fallback(self) -> Option<Self> {
        match self {
            Self::WebSocket => Some(Self::ChunkedStream),
            Self::ChunkedStream => Some(Self::LongPoll),
            Self::LongPoll => Some(Self::CrossDomainPoll),
            Self::CrossDomainPoll => None,
        }
    }

    /// Wire name, as carried in the `X-Atmosphere-Transport` header.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WebSocket => "websocket",
            Self::ChunkedStream => "streaming",
            Self::LongPoll => "long-polling",
            Self::CrossDomainPoll => "jsonp",
        }
    }

    /// Returns `true` for the poll-style kinds (everything but the
    /// persistent socket).
    #[inline]
    #[must_use]
    pub const fn is_http(self) -> bool {
        !matches!(self, Self::WebSocket)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TransportConfig
// ============================================================================

/// Configuration for one connection attempt.
///
/// Owned by the connection manager; the manager mutates the live transport
/// kind during fallback, not this struct.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Requested transport kind.
    pub transport: TransportKind,

    /// First substitute when the requested kind is unavailable.
    pub fallback: TransportKind,

    /// HTTP(S) endpoint the session is opened against.
    pub endpoint: Url,

    /// Idle/suspend timeout for poll-style transports.
    pub timeout: Duration,

    /// Reconnect ceiling: consecutive transport failures tolerated before a
    /// terminal failure is surfaced.
    pub max_request: u32,

    /// Byte ceiling for a streaming response body; exceeding it forces a
    /// transport cycle. Also bounds the reassembly buffer.
    pub max_streaming_length: usize,
}

impl TransportConfig {
    /// Creates a configuration with protocol defaults: WebSocket with
    /// chunked-streaming fallback, 60 reconnect attempts, 10 MB streaming
    /// ceiling.
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self {
            transport: TransportKind::WebSocket,
            fallback: TransportKind::ChunkedStream,
            endpoint,
            timeout: DEFAULT_TIMEOUT,
            max_request: DEFAULT_MAX_REQUEST,
            max_streaming_length: DEFAULT_MAX_STREAMING_LENGTH,
        }
    }

    /// Sets the requested transport kind.
    #[inline]
    #[must_use]
    pub const fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    /// Sets the fallback kind.
    #[inline]
    #[must_use]
    pub const fn with_fallback(mut self, fallback: TransportKind) -> Self {
        self.fallback = fallback;
        self
    }

    /// Sets the idle/suspend timeout.
    #[inline]
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the reconnect ceiling.
    #[inline]
    #[must_use]
    pub const fn with_max_request(mut self, max_request: u32) -> Self {
        self.max_request = max_request;
        self
    }

    /// Sets the streaming byte ceiling.
    #[inline]
    #[must_use]
    pub const fn with_max_streaming_length(mut self, max_streaming_length: usize) -> Self {
        self.max_streaming_length = max_streaming_length;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
