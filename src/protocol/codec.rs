//! Wire codec for protocol envelopes.
//!
//! Pure, stateless (de)serialization between the domain objects and the
//! JSON wire envelopes. The decoder is incremental: it distinguishes
//! "incomplete, wait for more bytes" from "malformed, discard and report",
//! which is what drives the connection manager's reassembly buffer.
//!
//! # Envelopes
//!
//! | Direction | Shape |
//! |-----------|-------|
//! | client → server | `{"handshake":{...}}` |
//! | client → server | `{"identity":"...","requests":[...]}` |
//! | server → client | `{"status":{"statusCode":...,"reasonPhrase":...},"identity":"..."}` |
//! | server → client | `{"responses":[{"uuid","status","path","headers","messageBody"}]}` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::error::Category;

use crate::error::Result;
use crate::identifiers::{Identity, RequestId};

use super::handshake::Handshake;
use super::request::{Header, Request};

// ============================================================================
// Wire Envelopes
// ============================================================================

/// Outer handshake envelope: `{"handshake":{...}}`.
#[derive(Serialize)]
struct HandshakeEnvelope<'a> {
    handshake: &'a Handshake,
}

/// Outer request batch envelope: `{"identity":...,"requests":[...]}`.
#[derive(Serialize)]
struct RequestBatchRef<'a> {
    identity: &'a Identity,
    requests: &'a [Request],
}

/// Owned form of the request batch envelope.
///
/// The client only ever serializes batches; the owned form exists so the
/// request side of the wire can be read back (round-trip checks, tooling).
#[derive(Debug, Clone, Deserialize)]
pub struct RequestBatchEnvelope {
    /// Session token assigned by the handshake ack.
    pub identity: Identity,
    /// The batched requests; one transport write carries them all.
    pub requests: Vec<Request>,
}

/// Status line inside a handshake ack.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StatusLine {
    #[serde(rename = "statusCode")]
    status_code: u16,
    #[serde(rename = "reasonPhrase", default)]
    reason_phrase: String,
}

/// Handshake ack envelope, recognized by its top-level `status` field.
#[derive(Deserialize)]
struct AckEnvelope {
    status: StatusLine,
    identity: Identity,
}

/// Response batch envelope, recognized by its top-level `responses` array.
#[derive(Deserialize)]
struct ResponsesEnvelope {
    responses: Vec<RawResponse>,
}

// ============================================================================
// RawResponse
// ============================================================================

/// One server response as it appears on the wire, before correlation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    /// Correlation id echoing the originating request.
    pub uuid: RequestId,

    /// Status code.
    pub status: u16,

    /// Human-readable status text, when the server sends one.
    #[serde(rename = "reasonPhrase", default, skip_serializing_if = "String::is_empty")]
    pub reason_phrase: String,

    /// Path echoed by the server.
    #[serde(default)]
    pub path: String,

    /// Response headers.
    #[serde(default)]
    pub headers: Vec<Header>,

    /// Response body.
    #[serde(rename = "messageBody", default)]
    pub message_body: String,
}

// ============================================================================
// DecodedMessage
// ============================================================================

/// A fully decoded inbound envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedMessage {
    /// Connection-establishment ack. Structurally similar to a response but
    /// semantically not one; the multiplexer gates on it.
    HandshakeAck {
        /// Server-assigned session token.
        identity: Identity,
        /// Ack status code.
        status_code: u16,
        /// Ack status text.
        reason_phrase: String,
    },

    /// A batch of responses to previously sent requests.
    Responses(Vec<RawResponse>),
}

// ============================================================================
// DecodeOutcome
// ============================================================================

/// Tri-state outcome of an incremental decode attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    /// A complete envelope was decoded; the reassembly buffer can be
    /// cleared.
    Complete(DecodedMessage),

    /// The bytes do not yet form a complete JSON document; retain them and
    /// wait for the next chunk.
    Incomplete,

    /// The bytes can never parse as JSON, or parse to something that is
    /// not a recognized envelope; discard the buffer and report.
    Malformed(String),
}

// ============================================================================
// Encoding
// ============================================================================

/// Encodes a handshake into its wire envelope.
///
/// # Errors
///
/// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
pub fn encode_handshake(handshake: &Handshake) -> Result<String> {
    Ok(serde_json::to_string(&HandshakeEnvelope { handshake })?)
}

/// Encodes a batch of requests into one wire envelope tagged with the
/// session identity.
///
/// All requests in the batch share one transport write but keep independent
/// uuids.
///
/// # Errors
///
/// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
pub fn encode_request_batch(identity: &Identity, requests: &[Request]) -> Result<String> {
    Ok(serde_json::to_string(&RequestBatchRef { identity, requests })?)
}

// ============================================================================
// Decoding
// ============================================================================

/// Attempts to decode an inbound payload as a protocol envelope.
///
/// Truncated JSON yields [`DecodeOutcome::Incomplete`] so the caller can
/// keep accumulating; syntactically broken or unrecognized documents yield
/// [`DecodeOutcome::Malformed`].
#[must_use]
pub fn decode_envelope(data: &str) -> DecodeOutcome {
    if data.trim().is_empty() {
        return DecodeOutcome::Incomplete;
    }

    let value: Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(e) if e.classify() == Category::Eof => return DecodeOutcome::Incomplete,
        Err(e) => return DecodeOutcome::Malformed(e.to_string()),
    };

    // A handshake ack is recognized by its top-level status field.
    if value.get("status").is_some() {
        return match serde_json::from_value::<AckEnvelope>(value) {
            Ok(ack) => DecodeOutcome::Complete(DecodedMessage::HandshakeAck {
                identity: ack.identity,
                status_code: ack.status.status_code,
                reason_phrase: ack.status.reason_phrase,
            }),
            Err(e) => DecodeOutcome::Malformed(e.to_string()),
        };
    }

    if value.get("responses").is_some() {
        return match serde_json::from_value::<ResponsesEnvelope>(value) {
            Ok(batch) => DecodeOutcome::Complete(DecodedMessage::Responses(batch.responses)),
            Err(e) => DecodeOutcome::Malformed(e.to_string()),
        };
    }

    DecodeOutcome::Malformed("neither handshake ack nor response batch".to_string())
}

// ============================================================================
// Tests
// ============================================================================
