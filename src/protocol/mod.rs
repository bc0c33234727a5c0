//! Protocol message types and wire codec.
//!
//! This module defines the domain objects exchanged over a SwaggerSocket
//! connection and the pure codec between them and the JSON wire envelopes.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | `Handshake` | Client → Server | Session negotiation, sent once |
//! | Handshake ack | Server → Client | Assigns the session [`Identity`](crate::identifiers::Identity) |
//! | `Request` batch | Client → Server | Multiplexed calls, correlated by uuid |
//! | `Response` batch | Server → Client | Results, demultiplexed by uuid |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `codec` | Stateless encode/decode with incremental (tri-state) decoding |
//! | `handshake` | Handshake message |
//! | `request` | Request and Response types |

// ============================================================================
// Submodules
// ============================================================================

/// Wire codec with incremental decoding.
pub mod codec;

/// Handshake message type.
pub mod handshake;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::{
    DecodeOutcome, DecodedMessage, RawResponse, RequestBatchEnvelope, decode_envelope,
    encode_handshake, encode_request_batch,
};
pub use handshake::{Handshake, PROTOCOL_NAME, PROTOCOL_VERSION};
pub use request::{Header, Request, Response};
