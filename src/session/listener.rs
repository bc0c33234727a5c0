//! Listener callbacks for session and per-request dispatch.
//!
//! A [`Listener`] is a set of optional callbacks. Every session carries
//! one; individual requests may attach their own, which takes precedence
//! for single-response dispatch. Unset callbacks are no-ops.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::error::Error;
use crate::protocol::Response;

// ============================================================================
// Callback Types
// ============================================================================

type OpenCallback = Box<dyn Fn(&Response) + Send + Sync>;
type ResponseCallback = Box<dyn Fn(&Response) + Send + Sync>;
type ResponsesCallback = Box<dyn Fn(&[Response]) + Send + Sync>;
type ErrorCallback = Box<dyn Fn(&Error, Option<&Response>) + Send + Sync>;
type CloseCallback = Box<dyn Fn() + Send + Sync>;

// ============================================================================
// Listener
// ============================================================================

/// Optional callback set invoked by the multiplexer during dispatch.
///
/// Exactly one of `on_response` / `on_responses` fires per inbound batch:
/// the former for a single-element batch, the latter otherwise.
#[derive(Default)]
pub struct Listener {
    on_open: Option<OpenCallback>,
    on_response: Option<ResponseCallback>,
    on_responses: Option<ResponsesCallback>,
    on_error: Option<ErrorCallback>,
    on_close: Option<CloseCallback>,
}

impl Listener {
    /// Creates an empty listener; every notification is a no-op.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once when the handshake ack opens the session.
    #[must_use]
    pub fn on_open(mut self, callback: impl Fn(&Response) + Send + Sync + 'static) -> Self {
        self.on_open = Some(Box::new(callback));
        self
    }

    /// Called for each single response dispatched to this listener.
    #[must_use]
    pub fn on_response(mut self, callback: impl Fn(&Response) + Send + Sync + 'static) -> Self {
        self.on_response = Some(Box::new(callback));
        self
    }

    /// Called once per multi-element response batch.
    #[must_use]
    pub fn on_responses(
        mut self,
        callback: impl Fn(&[Response]) + Send + Sync + 'static,
    ) -> Self {
        self.on_responses = Some(Box::new(callback));
        self
    }

    /// Called for error outcomes: failed responses, unmatched uuids,
    /// decode failures and terminal connection errors. The response is
    /// attached when one exists.
    #[must_use]
    pub fn on_error(
        mut self,
        callback: impl Fn(&Error, Option<&Response>) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Called once when the session closes.
    #[must_use]
    pub fn on_close(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_close = Some(Box::new(callback));
        self
    }

    // ------------------------------------------------------------------------
    // Dispatch plumbing
    // ------------------------------------------------------------------------

    pub(crate) fn notify_open(&self, response: &Response) {
        if let Some(callback) = &self.on_open {
            callback(response);
        }
    }

    pub(crate) fn notify_response(&self, response: &Response) {
        if let Some(callback) = &self.on_response {
            callback(response);
        }
    }

    pub(crate) fn notify_responses(&self, responses: &[Response]) {
        if let Some(callback) = &self.on_responses {
            callback(responses);
        }
    }

    pub(crate) fn notify_error(&self, error: &Error, response: Option<&Response>) {
        if let Some(callback) = &self.on_error {
            callback(error, response);
        }
    }

    pub(crate) fn notify_close(&self) {
        if let Some(callback) = &self.on_close {
            callback();
        }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("on_open", &self.on_open.is_some())
            .field("on_response", &self.on_response.is_some())
            .field("on_responses", &self.on_responses.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_close", &self.on_close.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::identifiers::RequestId;

    fn response() -> Response {
        Response {
            uuid: RequestId::generate(),
            request: None,
            status: 200,
            reason_phrase: "OK".to_string(),
            path: "/".to_string(),
            headers: Vec::new(),
            message_body: String::new(),
        }
    }

    #[test]
    fn test_empty_listener_is_noop() {
        let listener = Listener::new();
        listener.notify_open(&response());
        listener.notify_response(&response());
        listener.notify_responses(&[]);
        listener.notify_error(&Error::PrematureSend, None);
        listener.notify_close();
    }

    #[test]
    fn test_callbacks_fire() {
        let hits = Arc::new(AtomicUsize::new(0));
        let open_hits = Arc::clone(&hits);
        let close_hits = Arc::clone(&hits);

        let listener = Listener::new()
            .on_open(move |_| {
                open_hits.fetch_add(1, Ordering::SeqCst);
            })
            .on_close(move || {
                close_hits.fetch_add(1, Ordering::SeqCst);
            });

        listener.notify_open(&response());
        listener.notify_close();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_error_callback_receives_response() {
        let saw_response = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&saw_response);

        let listener = Listener::new().on_error(move |error, response| {
            assert!(error.is_protocol_error());
            if response.is_some() {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        listener.notify_error(&Error::PrematureSend, None);
        listener.notify_error(&Error::request_failed(500, "boom"), Some(&response()));
        assert_eq!(saw_response.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_debug_shows_wired_callbacks() {
        let listener = Listener::new().on_response(|_| {});
        let debug = format!("{listener:?}");
        assert!(debug.contains("on_response: true"));
        assert!(debug.contains("on_open: false"));
    }
}
