//! Handshake message type.
//!
//! The handshake is the first message sent on a freshly opened connection.
//! It negotiates protocol version, path and data format; the server answers
//! with an ack carrying the session [`Identity`](crate::identifiers::Identity).
//!
//! # Format
//!
//! ```json
//! {
//!   "handshake": {
//!     "protocolVersion": "1.0",
//!     "protocolName": "SwaggerSocket",
//!     "uuid": "00000000-0000-0000-0000-000000000000",
//!     "path": "/",
//!     "dataFormat": "JSON"
//!   }
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

use crate::identifiers::RequestId;

use super::request::Header;

// ============================================================================
// Constants
// ============================================================================

/// Protocol version carried in every handshake.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Protocol name carried in every handshake.
pub const PROTOCOL_NAME: &str = "SwaggerSocket";

// ============================================================================
// Handshake
// ============================================================================

/// Initial negotiation message, sent once per session open.
///
/// Never mutated after send; discarded after the ack is observed.
#[derive(Debug, Clone, Serialize)]
pub struct Handshake {
    /// Protocol version (always [`PROTOCOL_VERSION`]).
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,

    /// Protocol name (always [`PROTOCOL_NAME`]).
    #[serde(rename = "protocolName")]
    pub protocol_name: String,

    /// Handshake uuid. Nil: the handshake is not a multiplexed request.
    pub uuid: RequestId,

    /// Path the session is opened against.
    pub path: String,

    /// Data format of the message bodies (e.g. `"JSON"`).
    #[serde(rename = "dataFormat")]
    pub data_format: String,

    /// HTTP-style method used to open the connection. Not part of the wire
    /// envelope; consumed by the transport layer.
    #[serde(skip)]
    pub method: String,

    /// Optional headers forwarded to the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<Header>>,

    /// Optional query string pairs forwarded to the server.
    #[serde(rename = "queryString", skip_serializing_if = "Option::is_none")]
    pub query_string: Option<Vec<Header>>,
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors & Builder Methods
// ============================================================================

impl Handshake {
    /// Creates a handshake with protocol defaults (`POST /`, JSON bodies).
    #[must_use]
    pub fn new() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            protocol_name: PROTOCOL_NAME.to_string(),
            uuid: RequestId::nil(),
            path: "/".to_string(),
            data_format: "JSON".to_string(),
            method: "POST".to_string(),
            headers: None,
            query_string: None,
        }
    }

    /// Sets the session path.
    #[inline]
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the open method.
    #[inline]
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Sets the data format.
    #[inline]
    #[must_use]
    pub fn with_data_format(mut self, data_format: impl Into<String>) -> Self {
        self.data_format = data_format.into();
        self
    }

    /// Sets the forwarded headers.
    #[inline]
    #[must_use]
    pub fn with_headers(mut self, headers: Vec<Header>) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Sets the forwarded query string pairs.
    #[inline]
    #[must_use]
    pub fn with_query_string(mut self, query_string: Vec<Header>) -> Self {
        self.query_string = Some(query_string);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
