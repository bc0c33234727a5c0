//! The session multiplexer.
//!
//! A [`SwaggerSocket`] multiplexes many logical request/response exchanges
//! over one managed connection. Opening a session sends the handshake and
//! waits (asynchronously) for the ack that assigns the session
//! [`Identity`]; from then on requests are batched onto the wire tagged
//! with that identity, tracked in a pending map, and demultiplexed back to
//! listeners by uuid.
//!
//! # Dispatch
//!
//! | Inbound | Routed to |
//! |---------|-----------|
//! | Handshake ack | `on_open`, once; later acks are ignored |
//! | Single response, status < 400 | request listener's `on_response`, else session `on_response` |
//! | Single response, status >= 400 | same target's `on_error`, with the response attached |
//! | Multi-element batch | session `on_responses`, once |
//! | Response with unknown uuid | session `on_error` with [`Error::UnmatchedResponse`] |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::{Identity, RequestId};
use crate::protocol::{
    DecodedMessage, Handshake, RawResponse, Request, Response, encode_handshake,
    encode_request_batch,
};
use crate::transport::{
    ConnectionEvent, ConnectionManager, ConnectionState, NetTransportFactory, TransportConfig,
    TransportFactory,
};

use super::listener::Listener;

// ============================================================================
// SessionPhase
// ============================================================================

/// Protocol-level lifecycle of the session, distinct from the transport
/// connection state: a connection can be live while the session is still
/// waiting for its handshake ack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// Handshake sent, ack not yet observed. Sends are rejected.
    Connecting,
    /// Ack observed; the identity tags every outbound batch.
    Open(Identity),
    /// Closed or failed. Terminal.
    Closed,
}

// ============================================================================
// SwaggerSocket
// ============================================================================

/// Handle to one multiplexed session.
///
/// Cheap to clone; all clones share the session. Requires a tokio runtime:
/// opening spawns the connection and dispatch tasks.
#[derive(Debug, Clone)]
pub struct SwaggerSocket {
    inner: Arc<SocketInner>,
}

struct SocketInner {
    manager: ConnectionManager,
    phase: Mutex<SessionPhase>,
    pending: Mutex<FxHashMap<RequestId, Request>>,
    listener: Listener,
}

impl std::fmt::Debug for SocketInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketInner")
            .field("phase", &*self.phase.lock())
            .field("pending", &self.pending.lock().len())
            .finish_non_exhaustive()
    }
}

impl SwaggerSocket {
    /// Opens a session: establishes the connection (with fallback) and
    /// sends the handshake. Returns immediately; `listener.on_open` fires
    /// once the ack arrives.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the handshake cannot
    /// be encoded.
    pub fn open(
        config: TransportConfig,
        handshake: Handshake,
        listener: Listener,
    ) -> Result<Self> {
        Self::open_with_factory(config, handshake, listener, Arc::new(NetTransportFactory::new()))
    }

    /// Like [`open`](Self::open) but with a caller-supplied transport
    /// factory.
    pub fn open_with_factory(
        config: TransportConfig,
        handshake: Handshake,
        listener: Listener,
        factory: Arc<dyn TransportFactory>,
    ) -> Result<Self> {
        let payload = encode_handshake(&handshake)?;
        let (manager, events) = ConnectionManager::open(config, factory, payload);

        let inner = Arc::new(SocketInner {
            manager,
            phase: Mutex::new(SessionPhase::Connecting),
            pending: Mutex::new(FxHashMap::default()),
            listener,
        });
        tokio::spawn(dispatch_loop(Arc::clone(&inner), events));

        Ok(Self { inner })
    }

    /// Sends one request over the shared connection.
    ///
    /// Returns as soon as the encoded batch is handed to the connection;
    /// the response arrives later through a listener. The request is
    /// tracked as pending until its response is dispatched or the session
    /// ends.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PrematureSend`] before the handshake ack, and
    /// [`Error::ConnectionClosed`] after the session ends.
    pub fn send(&self, request: Request) -> Result<()> {
        self.send_batch(vec![request])
    }

    /// Sends several requests in one transport write.
    ///
    /// The batch shares one wire envelope; each request keeps its own uuid
    /// and is dispatched independently.
    ///
    /// # Errors
    ///
    /// Same conditions as [`send`](Self::send).
    pub fn send_batch(&self, requests: Vec<Request>) -> Result<()> {
        let identity = match &*self.inner.phase.lock() {
            SessionPhase::Open(identity) => identity.clone(),
            SessionPhase::Connecting => return Err(Error::PrematureSend),
            SessionPhase::Closed => return Err(Error::ConnectionClosed),
        };

        // phase-checked no-op: nothing to encode or track
        if requests.is_empty() {
            return Ok(());
        }

        let payload = encode_request_batch(&identity, &requests)?;

        {
            let mut pending = self.inner.pending.lock();
            for request in &requests {
                pending.insert(request.uuid, request.clone());
            }
        }

        debug!(count = requests.len(), bytes = payload.len(), "sending request batch");
        if let Err(e) = self.inner.manager.send(payload) {
            let mut pending = self.inner.pending.lock();
            for request in &requests {
                pending.remove(&request.uuid);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Closes the session deliberately. Outstanding requests are discarded
    /// without dispatch; `on_close` fires once the connection confirms.
    pub fn close(&self) {
        *self.inner.phase.lock() = SessionPhase::Closed;
        self.inner.manager.close();
    }

    /// Current session phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.inner.phase.lock().clone()
    }

    /// The server-assigned identity, once the session is open.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        match &*self.inner.phase.lock() {
            SessionPhase::Open(identity) => Some(identity.clone()),
            _ => None,
        }
    }

    /// Underlying connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.manager.state()
    }

    /// Number of requests awaiting a response.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }
}

// ============================================================================
// Dispatch
// ============================================================================

async fn dispatch_loop(
    inner: Arc<SocketInner>,
    mut events: mpsc::UnboundedReceiver<ConnectionEvent>,
) {
    while let Some(event) = events.recv().await {
        match event {
            ConnectionEvent::Opened { transport } => {
                debug!(transport = %transport, "transport ready, awaiting handshake ack");
            }
            ConnectionEvent::Downgraded { from, to } => {
                info!(from = %from, to = %to, "transport downgraded");
            }
            ConnectionEvent::Message(DecodedMessage::HandshakeAck {
                identity,
                status_code,
                reason_phrase,
            }) => {
                inner.handle_ack(identity, status_code, reason_phrase);
            }
            ConnectionEvent::Message(DecodedMessage::Responses(responses)) => {
                inner.dispatch_responses(responses);
            }
            ConnectionEvent::DecodeFailed(message) => {
                inner
                    .listener
                    .notify_error(&Error::decode_malformed(message), None);
            }
            ConnectionEvent::Reconnecting { attempt } => {
                // the lost transport may have swallowed outstanding batches,
                // and the reconnect handshake starts a fresh server-side
                // exchange; their responses will never arrive
                debug!(attempt, "reconnecting, failing outstanding requests");
                inner.fail_pending(&Error::transport(
                    "connection lost before a response arrived",
                ));
            }
            ConnectionEvent::Closed => {
                *inner.phase.lock() = SessionPhase::Closed;
                let discarded = {
                    let mut pending = inner.pending.lock();
                    let discarded = pending.len();
                    pending.clear();
                    discarded
                };
                if discarded > 0 {
                    debug!(discarded, "pending requests discarded on close");
                }
                inner.listener.notify_close();
            }
            ConnectionEvent::Failed(error) => {
                warn!(error = %error, "session failed");
                *inner.phase.lock() = SessionPhase::Closed;
                inner.fail_pending(&error);
                inner.listener.notify_error(&error, None);
            }
        }
    }
}

impl SocketInner {
    /// Drains the pending table, reporting `error` to each request's own
    /// listener (or the session listener). No lock is held while listeners
    /// run.
    fn fail_pending(&self, error: &Error) {
        let drained: Vec<Request> = {
            let mut pending = self.pending.lock();
            pending.drain().map(|(_, request)| request).collect()
        };
        if drained.is_empty() {
            return;
        }
        warn!(count = drained.len(), "failing outstanding requests");
        for request in &drained {
            let target = request.listener.as_deref().unwrap_or(&self.listener);
            target.notify_error(error, None);
        }
    }

    /// Opens the session on the first successful ack; later acks never
    /// replace the identity.
    fn handle_ack(&self, identity: Identity, status_code: u16, reason_phrase: String) {
        if status_code >= 400 {
            warn!(status_code, "handshake rejected");
            *self.phase.lock() = SessionPhase::Closed;
            self.listener
                .notify_error(&Error::request_failed(status_code, reason_phrase), None);
            self.manager.close();
            return;
        }

        {
            let mut phase = self.phase.lock();
            match &*phase {
                SessionPhase::Connecting => {
                    info!(identity = %identity, "session open");
                    *phase = SessionPhase::Open(identity.clone());
                }
                SessionPhase::Open(_) => {
                    warn!("handshake ack on an open session, keeping existing identity");
                    return;
                }
                SessionPhase::Closed => return,
            }
        }

        let ack = Response {
            uuid: RequestId::nil(),
            request: None,
            status: status_code,
            reason_phrase,
            path: "/".to_string(),
            headers: Vec::new(),
            message_body: String::new(),
        };
        self.listener.notify_open(&ack);
    }

    /// Correlates a decoded batch against the pending map and routes each
    /// element. No lock is held while listeners run.
    fn dispatch_responses(&self, raw: Vec<RawResponse>) {
        let single = raw.len() == 1;

        let mut matched = Vec::with_capacity(raw.len());
        let mut unmatched = Vec::new();
        {
            let mut pending = self.pending.lock();
            for response in raw {
                let request = pending.remove(&response.uuid);
                let response = Response {
                    uuid: response.uuid,
                    request,
                    status: response.status,
                    reason_phrase: response.reason_phrase,
                    path: response.path,
                    headers: response.headers,
                    message_body: response.message_body,
                };
                if response.request.is_some() {
                    matched.push(response);
                } else {
                    unmatched.push(response);
                }
            }
        }

        for response in &unmatched {
            warn!(uuid = %response.uuid, "response without a pending request");
            self.listener
                .notify_error(&Error::unmatched_response(response.uuid), Some(response));
        }

        if single {
            if let Some(response) = matched.into_iter().next() {
                let request_listener = response
                    .request
                    .as_ref()
                    .and_then(|request| request.listener.clone());
                let target = request_listener.as_deref().unwrap_or(&self.listener);

                if response.is_error() {
                    target.notify_error(
                        &Error::request_failed(response.status, response.reason_phrase.clone()),
                        Some(&response),
                    );
                } else {
                    target.notify_response(&response);
                }
            }
        } else if !matched.is_empty() {
            self.listener.notify_responses(&matched);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::time::timeout;
    use url::Url;

    use crate::transport::TransportEvent;
    use crate::transport::TransportKind;
    use crate::transport::testing::ScriptedFactory;

    const TICK: Duration = Duration::from_secs(1);

    /// Listener events flattened for assertion over a channel.
    #[derive(Debug, PartialEq)]
    enum Seen {
        Open(u16),
        Response(RequestId, u16, String),
        Responses(Vec<RequestId>),
        Error(String),
        Close,
    }

    fn wired_listener(tx: mpsc::UnboundedSender<Seen>) -> Listener {
        let open_tx = tx.clone();
        let response_tx = tx.clone();
        let responses_tx = tx.clone();
        let error_tx = tx.clone();
        let close_tx = tx;

        Listener::new()
            .on_open(move |ack| {
                let _ = open_tx.send(Seen::Open(ack.status));
            })
            .on_response(move |response| {
                let _ = response_tx.send(Seen::Response(
                    response.uuid,
                    response.status,
                    response.message_body.clone(),
                ));
            })
            .on_responses(move |responses| {
                let _ = responses_tx.send(Seen::Responses(
                    responses.iter().map(|r| r.uuid).collect(),
                ));
            })
            .on_error(move |error, _response| {
                let _ = error_tx.send(Seen::Error(error.to_string()));
            })
            .on_close(move || {
                let _ = close_tx.send(Seen::Close);
            })
    }

    fn config() -> TransportConfig {
        TransportConfig::new(Url::parse("http://127.0.0.1:8080/swagger").unwrap())
            .with_transport(TransportKind::LongPoll)
    }

    fn ack_payload(identity: &str) -> String {
        format!(r#"{{"status":{{"statusCode":200,"reasonPhrase":"OK"}},"identity":"{identity}"}}"#)
    }

    fn response_payload(uuid: RequestId, status: u16, body: &str) -> String {
        format!(
            r#"{{"responses":[{{"uuid":"{uuid}","status":{status},"path":"/x","headers":[],"messageBody":"{body}"}}]}}"#
        )
    }

    async fn next_seen(rx: &mut mpsc::UnboundedReceiver<Seen>) -> Seen {
        timeout(TICK, rx.recv())
            .await
            .expect("listener event within deadline")
            .expect("channel open")
    }

    /// Opens a session against a scripted factory and drives it to Open.
    async fn open_session(
        factory: Arc<ScriptedFactory>,
    ) -> (SwaggerSocket, mpsc::UnboundedReceiver<Seen>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let socket = SwaggerSocket::open_with_factory(
            config(),
            Handshake::new().with_path("/swagger"),
            wired_listener(tx),
            factory.clone(),
        )
        .expect("open");

        // wait for the opening request, then answer with the ack
        timeout(TICK, async {
            loop {
                if !factory.taps.lock().is_empty() {
                    return;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("connected");
        factory
            .tap(0)
            .send(TransportEvent::Data(ack_payload("session-1")))
            .unwrap();

        assert_eq!(next_seen(&mut rx).await, Seen::Open(200));
        (socket, rx)
    }

    #[tokio::test]
    async fn test_send_before_ack_is_rejected() {
        let factory = Arc::new(ScriptedFactory::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let socket = SwaggerSocket::open_with_factory(
            config(),
            Handshake::new(),
            wired_listener(tx),
            factory,
        )
        .expect("open");

        assert!(matches!(
            socket.send(Request::new()),
            Err(Error::PrematureSend)
        ));
        assert_eq!(socket.pending_count(), 0);
        assert_eq!(socket.phase(), SessionPhase::Connecting);
    }

    #[tokio::test]
    async fn test_handshake_ack_opens_session() {
        let factory = Arc::new(ScriptedFactory::new());
        let (socket, _rx) = open_session(factory.clone()).await;

        assert_eq!(socket.identity(), Some(Identity::new("session-1")));
        assert_eq!(socket.phase(), SessionPhase::Open(Identity::new("session-1")));

        // the handshake went out as the opening payload
        let sent = factory.sent.lock();
        assert!(sent[0].contains("\"protocolName\":\"SwaggerSocket\""));
    }

    #[tokio::test]
    async fn test_request_batch_carries_identity() {
        let factory = Arc::new(ScriptedFactory::new());
        let (socket, _rx) = open_session(factory.clone()).await;

        let first = Request::new().with_path("/a").with_body("one");
        let second = Request::new().with_path("/b").with_body("two");
        socket
            .send_batch(vec![first.clone(), second.clone()])
            .unwrap();

        timeout(TICK, async {
            loop {
                if factory.sent.lock().len() == 2 {
                    return;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("batch written");

        let sent = factory.sent.lock();
        let envelope: serde_json::Value = serde_json::from_str(&sent[1]).unwrap();
        assert_eq!(envelope["identity"], "session-1");
        let wire = envelope["requests"].as_array().unwrap();
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0]["uuid"], first.uuid.to_string());
        assert_eq!(wire[1]["uuid"], second.uuid.to_string());
        assert_eq!(socket.pending_count(), 2);
    }

    #[tokio::test]
    async fn test_single_response_dispatch() {
        let factory = Arc::new(ScriptedFactory::new());
        let (socket, mut rx) = open_session(factory.clone()).await;

        let request = Request::new().with_path("/a");
        socket.send(request.clone()).unwrap();
        factory
            .tap(0)
            .send(TransportEvent::Data(response_payload(request.uuid, 200, "ok")))
            .unwrap();

        assert_eq!(
            next_seen(&mut rx).await,
            Seen::Response(request.uuid, 200, "ok".to_string())
        );
        assert_eq!(socket.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_error_status_routes_to_on_error() {
        let factory = Arc::new(ScriptedFactory::new());
        let (socket, mut rx) = open_session(factory.clone()).await;

        let request = Request::new();
        socket.send(request.clone()).unwrap();
        factory
            .tap(0)
            .send(TransportEvent::Data(response_payload(request.uuid, 500, "boom")))
            .unwrap();

        match next_seen(&mut rx).await {
            Seen::Error(message) => assert!(message.contains("500")),
            other => panic!("expected Error, got {other:?}"),
        }
        assert_eq!(socket.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_per_request_listener_takes_precedence() {
        let factory = Arc::new(ScriptedFactory::new());
        let (socket, mut session_rx) = open_session(factory.clone()).await;

        let (request_tx, mut request_rx) = mpsc::unbounded_channel();
        let request_listener = Arc::new(Listener::new().on_response(move |response| {
            let _ = request_tx.send(response.uuid);
        }));
        let request = Request::new().with_listener(request_listener);
        socket.send(request.clone()).unwrap();

        factory
            .tap(0)
            .send(TransportEvent::Data(response_payload(request.uuid, 200, "ok")))
            .unwrap();

        let uuid = timeout(TICK, request_rx.recv())
            .await
            .expect("request listener fired")
            .unwrap();
        assert_eq!(uuid, request.uuid);
        // the session listener saw nothing for this response
        assert!(timeout(Duration::from_millis(50), session_rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn test_batch_dispatches_once_to_on_responses() {
        let factory = Arc::new(ScriptedFactory::new());
        let (socket, mut rx) = open_session(factory.clone()).await;

        let first = Request::new();
        let second = Request::new();
        socket.send_batch(vec![first.clone(), second.clone()]).unwrap();

        let batch = format!(
            r#"{{"responses":[{{"uuid":"{}","status":200,"path":"/","headers":[],"messageBody":"a"}},{{"uuid":"{}","status":200,"path":"/","headers":[],"messageBody":"b"}}]}}"#,
            first.uuid, second.uuid
        );
        factory.tap(0).send(TransportEvent::Data(batch)).unwrap();

        assert_eq!(
            next_seen(&mut rx).await,
            Seen::Responses(vec![first.uuid, second.uuid])
        );
        assert_eq!(socket.pending_count(), 0);
        // exclusivity: no single-response dispatch follows
        assert!(timeout(Duration::from_millis(50), rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn test_unmatched_response_reported() {
        let factory = Arc::new(ScriptedFactory::new());
        let (socket, mut rx) = open_session(factory.clone()).await;

        let stray = RequestId::generate();
        factory
            .tap(0)
            .send(TransportEvent::Data(response_payload(stray, 200, "x")))
            .unwrap();

        match next_seen(&mut rx).await {
            Seen::Error(message) => assert!(message.contains("no matching pending request")),
            other => panic!("expected Error, got {other:?}"),
        }
        assert_eq!(socket.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_response_is_unmatched() {
        let factory = Arc::new(ScriptedFactory::new());
        let (socket, mut rx) = open_session(factory.clone()).await;

        let request = Request::new();
        socket.send(request.clone()).unwrap();

        let tap = factory.tap(0);
        tap.send(TransportEvent::Data(response_payload(request.uuid, 200, "ok")))
            .unwrap();
        assert_eq!(
            next_seen(&mut rx).await,
            Seen::Response(request.uuid, 200, "ok".to_string())
        );

        // the uuid was released on dispatch; a replay no longer matches
        tap.send(TransportEvent::Data(response_payload(request.uuid, 200, "ok")))
            .unwrap();
        match next_seen(&mut rx).await {
            Seen::Error(message) => assert!(message.contains("no matching pending request")),
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_batch_respects_phase() {
        let factory = Arc::new(ScriptedFactory::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let connecting = SwaggerSocket::open_with_factory(
            config(),
            Handshake::new(),
            wired_listener(tx),
            factory,
        )
        .expect("open");
        assert!(matches!(
            connecting.send_batch(Vec::new()),
            Err(Error::PrematureSend)
        ));

        let factory = Arc::new(ScriptedFactory::new());
        let (socket, mut rx) = open_session(factory.clone()).await;
        socket.send_batch(Vec::new()).unwrap();
        // nothing beyond the handshake went out
        assert_eq!(factory.sent.lock().len(), 1);

        socket.close();
        assert_eq!(next_seen(&mut rx).await, Seen::Close);
        assert!(matches!(
            socket.send_batch(Vec::new()),
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_transport_loss_fails_outstanding_requests() {
        let factory = Arc::new(ScriptedFactory::new());
        let (socket, mut rx) = open_session(factory.clone()).await;

        let (request_tx, mut request_rx) = mpsc::unbounded_channel();
        let request_listener = Arc::new(Listener::new().on_error(move |error, _response| {
            let _ = request_tx.send(error.to_string());
        }));
        let with_own_listener = Request::new().with_listener(request_listener);
        let plain = Request::new();
        socket
            .send_batch(vec![with_own_listener, plain])
            .unwrap();
        assert_eq!(socket.pending_count(), 2);

        factory.tap(0).send(TransportEvent::Closed).unwrap();

        // the request that carried its own listener hears the failure there
        let message = timeout(TICK, request_rx.recv())
            .await
            .expect("request listener fired")
            .unwrap();
        assert!(message.contains("connection lost"));
        // the plain request falls back to the session listener
        match next_seen(&mut rx).await {
            Seen::Error(message) => assert!(message.contains("connection lost")),
            other => panic!("expected Error, got {other:?}"),
        }
        assert_eq!(socket.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_close_discards_pending_and_notifies() {
        let factory = Arc::new(ScriptedFactory::new());
        let (socket, mut rx) = open_session(factory.clone()).await;

        socket.send(Request::new()).unwrap();
        assert_eq!(socket.pending_count(), 1);

        socket.close();
        assert_eq!(next_seen(&mut rx).await, Seen::Close);
        assert_eq!(socket.phase(), SessionPhase::Closed);
        assert_eq!(socket.pending_count(), 0);

        assert!(matches!(
            socket.send(Request::new()),
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_rejected_handshake_fails_session() {
        let factory = Arc::new(ScriptedFactory::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let socket = SwaggerSocket::open_with_factory(
            config(),
            Handshake::new(),
            wired_listener(tx),
            factory.clone(),
        )
        .expect("open");

        timeout(TICK, async {
            loop {
                if !factory.taps.lock().is_empty() {
                    return;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("connected");
        factory
            .tap(0)
            .send(TransportEvent::Data(
                r#"{"status":{"statusCode":503,"reasonPhrase":"busy"},"identity":"n/a"}"#.to_string(),
            ))
            .unwrap();

        match next_seen(&mut rx).await {
            Seen::Error(message) => assert!(message.contains("503")),
            other => panic!("expected Error, got {other:?}"),
        }
        assert_eq!(socket.phase(), SessionPhase::Closed);
    }
}
