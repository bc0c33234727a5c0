//! Registry of live sessions.
//!
//! Applications juggling several endpoints can park their sockets here and
//! address them by handle. Purely a convenience: sockets work the same
//! outside a registry.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use super::socket::SwaggerSocket;

// ============================================================================
// SocketId
// ============================================================================

/// Registry-assigned handle for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketId(u64);

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "socket-{}", self.0)
    }
}

// ============================================================================
// SocketRegistry
// ============================================================================

/// Thread-safe collection of live sessions, addressed by [`SocketId`].
#[derive(Debug, Default)]
pub struct SocketRegistry {
    sockets: RwLock<FxHashMap<SocketId, SwaggerSocket>>,
    next_id: AtomicU64,
}

impl SocketRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session and returns its handle.
    pub fn register(&self, socket: SwaggerSocket) -> SocketId {
        let id = SocketId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.sockets.write().insert(id, socket);
        debug!(id = %id, "socket registered");
        id
    }

    /// Looks up a session. The returned handle shares the session with the
    /// registered one.
    #[must_use]
    pub fn get(&self, id: SocketId) -> Option<SwaggerSocket> {
        self.sockets.read().get(&id).cloned()
    }

    /// Removes a session without closing it.
    pub fn remove(&self, id: SocketId) -> Option<SwaggerSocket> {
        let removed = self.sockets.write().remove(&id);
        if removed.is_some() {
            debug!(id = %id, "socket removed");
        }
        removed
    }

    /// Closes and removes a session. Returns `false` for an unknown handle.
    pub fn close(&self, id: SocketId) -> bool {
        match self.remove(id) {
            Some(socket) => {
                socket.close();
                true
            }
            None => false,
        }
    }

    /// Closes and removes every session.
    pub fn close_all(&self) {
        let drained: Vec<_> = {
            let mut sockets = self.sockets.write();
            sockets.drain().collect()
        };
        debug!(count = drained.len(), "closing all sockets");
        for (_, socket) in drained {
            socket.close();
        }
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sockets.read().len()
    }

    /// Returns `true` when no session is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sockets.read().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
