//! Session layer: the multiplexer, its listeners and the socket registry.
//!
//! A session rides on one managed connection (see
//! [`transport`](crate::transport)) and multiplexes many logical
//! request/response exchanges over it, correlating responses back to their
//! requests by uuid and routing them to [`Listener`] callbacks.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `socket` | The [`SwaggerSocket`] multiplexer |
//! | `listener` | Callback sets for dispatch |
//! | `registry` | Handle-addressed collection of live sessions |

// ============================================================================
// Submodules
// ============================================================================

/// Listener callback sets.
pub mod listener;

/// Handle-addressed collection of live sessions.
pub mod registry;

/// The session multiplexer.
pub mod socket;

// ============================================================================
// Re-exports
// ============================================================================

pub use listener::Listener;
pub use registry::{SocketId, SocketRegistry};
pub use socket::{SessionPhase, SwaggerSocket};
