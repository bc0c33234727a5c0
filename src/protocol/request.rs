//! Request and Response message types.
//!
//! A [`Request`] is one logical call multiplexed over the shared connection;
//! a [`Response`] is the decoded result correlated back to it by uuid.
//!
//! # Format
//!
//! One request inside a batch envelope:
//!
//! ```json
//! {
//!   "uuid": "...",
//!   "method": "POST",
//!   "path": "/pet",
//!   "dataFormat": "JSON",
//!   "messageBody": "..."
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::identifiers::RequestId;
use crate::session::Listener;

// ============================================================================
// Header
// ============================================================================

/// One name/value pair, used for both headers and query strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Header or parameter name.
    pub name: String,
    /// Header or parameter value.
    pub value: String,
}

impl Header {
    /// Creates a name/value pair.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

// ============================================================================
// Request
// ============================================================================

/// One logical call multiplexed over the shared connection.
///
/// The uuid is assigned at construction and must not be reused while the
/// request is outstanding. The multiplexer owns the request from `send`
/// until its response arrives or the session closes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Globally unique, client-generated correlation id.
    pub uuid: RequestId,

    /// HTTP-style method.
    pub method: String,

    /// Target path.
    pub path: String,

    /// Data format of the message body.
    #[serde(rename = "dataFormat")]
    pub data_format: String,

    /// Optional headers.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub headers: Option<Vec<Header>>,

    /// Optional query string pairs.
    #[serde(
        rename = "queryString",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub query_string: Option<Vec<Header>>,

    /// Request body.
    #[serde(rename = "messageBody")]
    pub message_body: String,

    /// Per-request callback set. Never serialized; dispatch falls back to
    /// the session listener when unset.
    #[serde(skip)]
    pub listener: Option<Arc<Listener>>,
}

impl Request {
    /// Creates a request with a freshly generated uuid and protocol
    /// defaults (`POST /`, JSON body format, empty body).
    #[must_use]
    pub fn new() -> Self {
        Self {
            uuid: RequestId::generate(),
            method: "POST".to_string(),
            path: "/".to_string(),
            data_format: "JSON".to_string(),
            headers: None,
            query_string: None,
            message_body: String::new(),
            listener: None,
        }
    }

    /// Creates a request with a specific uuid.
    #[inline]
    #[must_use]
    pub fn with_uuid(mut self, uuid: RequestId) -> Self {
        self.uuid = uuid;
        self
    }

    /// Sets the method.
    #[inline]
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Sets the target path.
    #[inline]
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the data format.
    #[inline]
    #[must_use]
    pub fn with_data_format(mut self, data_format: impl Into<String>) -> Self {
        self.data_format = data_format.into();
        self
    }

    /// Sets the headers.
    #[inline]
    #[must_use]
    pub fn with_headers(mut self, headers: Vec<Header>) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Sets the query string pairs.
    #[inline]
    #[must_use]
    pub fn with_query_string(mut self, query_string: Vec<Header>) -> Self {
        self.query_string = Some(query_string);
        self
    }

    /// Sets the request body.
    #[inline]
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.message_body = body.into();
        self
    }

    /// Attaches a per-request listener.
    #[inline]
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<Listener>) -> Self {
        self.listener = Some(listener);
        self
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Request {
    /// Wire-field equality; the attached listener does not participate.
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
            && self.method == other.method
            && self.path == other.path
            && self.data_format == other.data_format
            && self.headers == other.headers
            && self.query_string == other.query_string
            && self.message_body == other.message_body
    }
}

// ============================================================================
// Response
// ============================================================================

/// Result of one [`Request`], built by the multiplexer from a decoded
/// envelope and handed to a listener.
///
/// Transient: constructed per incoming envelope element and discarded after
/// dispatch. The `request` back-reference is lookup-only.
#[derive(Debug, Clone)]
pub struct Response {
    /// Correlation id echoing the originating request.
    pub uuid: RequestId,

    /// The originating request, when one was pending under this uuid.
    pub request: Option<Request>,

    /// Status code. `400` and above dispatches as an error outcome.
    pub status: u16,

    /// Human-readable status text.
    pub reason_phrase: String,

    /// Path echoed by the server.
    pub path: String,

    /// Response headers.
    pub headers: Vec<Header>,

    /// Response body.
    pub message_body: String,
}

impl Response {
    /// Returns `true` if the status dispatches as success (below 400).
    #[inline]
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status < 400
    }

    /// Returns `true` if the status dispatches as an error (400 and above).
    #[inline]
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.status >= 400
    }
}

// ============================================================================
// Tests
// ============================================================================
