//! HTTP-style transports: chunked streaming, long-poll and cross-domain
//! poll.
//!
//! All three keep a server→client channel open by re-issuing HTTP requests
//! and push client→server payloads as separate one-shot POSTs. They differ
//! in how the inbound channel is held:
//!
//! | Transport | Inbound channel |
//! |-----------|-----------------|
//! | [`ChunkedStreamTransport`] | One suspended chunked response, cycled when it grows past the byte ceiling |
//! | [`LongPollTransport`] | Response completes per message; a fresh GET is issued immediately |
//! | [`CrossDomainPollTransport`] | Like long-poll, but every field travels on the query string |
//!
//! The opening request carries the initial payload (the handshake) as its
//! body; subsequent polls are plain GETs with no body.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};

use super::config::{TransportConfig, TransportKind};
use super::{Transport, TransportEvent};

// ============================================================================
// Constants
// ============================================================================

/// Header naming the transport kind on every request.
const TRANSPORT_HEADER: &str = "X-Atmosphere-Transport";

/// Header carrying the per-connection tracking id.
const TRACKING_HEADER: &str = "X-Atmosphere-tracking-id";

/// Query parameter carrying the payload for cross-domain polling, which
/// cannot set custom headers or bodies.
const POST_BODY_PARAM: &str = "X-Atmosphere-Post-Body";

/// Wire name used for one-shot payload pushes.
const PUSH_TRANSPORT: &str = "polling";

/// Streaming responses open with a comment preamble; everything up to and
/// including the end marker is padding, not protocol data.
const JUNK_PREFIX: &str = "<!-- Welcome to the Atmosphere Framework.";
const JUNK_END: &str = "<!-- EOD -->";

// ============================================================================
// Utf8Assembler
// ============================================================================

/// Reassembles text from raw chunks whose boundaries may split a multibyte
/// UTF-8 character.
///
/// Releases the longest complete-UTF-8 prefix of the accumulated bytes and
/// holds the trailing partial character for the next chunk. A genuinely
/// invalid sequence is released with replacement characters rather than
/// held forever.
#[derive(Debug, Default)]
struct Utf8Assembler {
    tail: Vec<u8>,
}

impl Utf8Assembler {
    fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk; returns the text it releases, if any.
    fn push(&mut self, chunk: &[u8]) -> Option<String> {
        self.tail.extend_from_slice(chunk);

        let valid_up_to = match std::str::from_utf8(&self.tail) {
            Ok(text) => {
                if text.is_empty() {
                    return None;
                }
                let text = text.to_owned();
                self.tail.clear();
                return Some(text);
            }
            // trailing bytes are the start of a character still in flight
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => {
                let text = String::from_utf8_lossy(&self.tail).into_owned();
                self.tail.clear();
                return Some(text);
            }
        };

        if valid_up_to == 0 {
            return None;
        }
        let text = String::from_utf8_lossy(&self.tail[..valid_up_to]).into_owned();
        self.tail.drain(..valid_up_to);
        Some(text)
    }
}

// ============================================================================
// JunkFilter
// ============================================================================

/// Strips the streaming preamble from the front of a response body.
///
/// Decides once per response whether the body opens with the padding
/// comment; if so, swallows everything through [`JUNK_END`] and passes the
/// remainder through untouched.
#[derive(Debug, Default)]
struct JunkFilter {
    buffer: String,
    decided: bool,
    junk: bool,
}

impl JunkFilter {
    fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk; returns the protocol bytes it releases, if any.
    fn push(&mut self, chunk: &str) -> Option<String> {
        if self.decided && !self.junk {
            return Some(chunk.to_owned());
        }

        self.buffer.push_str(chunk);

        if !self.decided {
            if self.buffer.len() < JUNK_PREFIX.len() {
                if JUNK_PREFIX.starts_with(self.buffer.as_str()) {
                    // could still turn out to be the preamble
                    return None;
                }
                self.decided = true;
                return Some(std::mem::take(&mut self.buffer));
            }
            self.decided = true;
            self.junk = self.buffer.starts_with(JUNK_PREFIX);
            if !self.junk {
                return Some(std::mem::take(&mut self.buffer));
            }
        }

        match self.buffer.find(JUNK_END) {
            Some(idx) => {
                let rest = self.buffer[idx + JUNK_END.len()..]
                    .trim_start()
                    .to_owned();
                self.buffer.clear();
                self.junk = false;
                if rest.is_empty() { None } else { Some(rest) }
            }
            None => None,
        }
    }
}

// ============================================================================
// Shared Plumbing
// ============================================================================

/// Builds the shared HTTP client. No global timeout: suspended responses
/// are expected to outlive any fixed request deadline.
fn build_client() -> Result<Client> {
    Ok(Client::builder().build()?)
}

fn new_tracking_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// One-shot payload push used by the header-capable transports.
async fn push_payload(
    client: &Client,
    endpoint: &Url,
    tracking_id: &str,
    payload: String,
) -> Result<()> {
    trace!(bytes = payload.len(), "push payload");
    let response = client
        .post(endpoint.clone())
        .header(TRANSPORT_HEADER, PUSH_TRANSPORT)
        .header(TRACKING_HEADER, tracking_id)
        .body(payload)
        .send()
        .await?;

    if response.status().is_success() {
        Ok(())
    } else {
        Err(Error::transport(format!(
            "payload push rejected with status {}",
            response.status()
        )))
    }
}

// ============================================================================
// ChunkedStreamTransport
// ============================================================================

/// Chunked HTTP streaming: one suspended response delivers many chunks.
///
/// When the cumulative body grows past the configured byte ceiling the
/// response is dropped and re-issued, invisible to the caller. A naturally
/// ended stream is reported as [`TransportEvent::Closed`] so the manager
/// can run its reconnect policy.
pub struct ChunkedStreamTransport {
    client: Client,
    endpoint: Url,
    tracking_id: String,
    task: JoinHandle<()>,
    closed: Arc<AtomicBool>,
}

impl ChunkedStreamTransport {
    /// Opens the streaming channel; the initial payload rides in the body
    /// of the opening POST.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`](crate::Error::Http) if the client cannot be
    /// built.
    pub async fn connect(
        config: &TransportConfig,
        initial_payload: Option<String>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Self> {
        let client = build_client()?;
        let tracking_id = new_tracking_id();
        let closed = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(stream_loop(
            client.clone(),
            config.endpoint.clone(),
            tracking_id.clone(),
            initial_payload,
            config.max_streaming_length,
            events,
            Arc::clone(&closed),
        ));

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            tracking_id,
            task,
            closed,
        })
    }
}

#[async_trait::async_trait]
impl Transport for ChunkedStreamTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::ChunkedStream
    }

    async fn send(&mut self, payload: String) -> Result<()> {
        push_payload(&self.client, &self.endpoint, &self.tracking_id, payload).await
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.task.abort();
    }
}

/// Holds the streaming channel open, cycling it when the byte ceiling is
/// reached.
async fn stream_loop(
    client: Client,
    endpoint: Url,
    tracking_id: String,
    initial_payload: Option<String>,
    max_streaming_length: usize,
    events: mpsc::UnboundedSender<TransportEvent>,
    closed: Arc<AtomicBool>,
) {
    let mut body = initial_payload;
    let mut opened = false;

    loop {
        if closed.load(Ordering::SeqCst) {
            return;
        }

        let builder = match body.take() {
            Some(payload) => client.post(endpoint.clone()).body(payload),
            None => client.get(endpoint.clone()),
        };
        let builder = builder
            .header(TRANSPORT_HEADER, TransportKind::ChunkedStream.as_str())
            .header(TRACKING_HEADER, tracking_id.as_str());

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let _ = events.send(TransportEvent::Error(e.to_string()));
                return;
            }
        };
        if !response.status().is_success() {
            let _ = events.send(TransportEvent::Error(format!(
                "streaming request rejected with status {}",
                response.status()
            )));
            return;
        }

        if !opened {
            opened = true;
            if events.send(TransportEvent::Opened).is_err() {
                return;
            }
        }

        let mut stream = response.bytes_stream();
        let mut assembler = Utf8Assembler::new();
        let mut filter = JunkFilter::new();
        let mut total = 0usize;
        let mut cycle = false;

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    return;
                }
            };

            total += chunk.len();
            if let Some(text) = assembler.push(&chunk) {
                if let Some(data) = filter.push(&text) {
                    if events.send(TransportEvent::Data(data)).is_err() {
                        return;
                    }
                }
            }

            if total > max_streaming_length {
                debug!(total, max_streaming_length, "streaming ceiling reached, cycling");
                cycle = true;
                break;
            }
        }

        if cycle {
            continue;
        }

        // natural end of stream
        if !closed.load(Ordering::SeqCst) {
            let _ = events.send(TransportEvent::Closed);
        }
        return;
    }
}

// ============================================================================
// LongPollTransport
// ============================================================================

/// Long-polling: each completed response delivers one payload, after which
/// a fresh GET is issued immediately.
///
/// A poll that idles past the configured suspend timeout is silently
/// re-issued; only genuine request failures surface as transport errors.
pub struct LongPollTransport {
    client: Client,
    endpoint: Url,
    tracking_id: String,
    task: JoinHandle<()>,
    closed: Arc<AtomicBool>,
}

impl LongPollTransport {
    /// Opens the polling channel; the initial payload rides in the body of
    /// the opening POST, every later poll is a plain GET.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`](crate::Error::Http) if the client cannot be
    /// built.
    pub async fn connect(
        config: &TransportConfig,
        initial_payload: Option<String>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Self> {
        let client = build_client()?;
        let tracking_id = new_tracking_id();
        let closed = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(poll_loop(
            client.clone(),
            config.endpoint.clone(),
            tracking_id.clone(),
            initial_payload,
            config.timeout,
            events,
            Arc::clone(&closed),
        ));

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            tracking_id,
            task,
            closed,
        })
    }
}

#[async_trait::async_trait]
impl Transport for LongPollTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::LongPoll
    }

    async fn send(&mut self, payload: String) -> Result<()> {
        push_payload(&self.client, &self.endpoint, &self.tracking_id, payload).await
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.task.abort();
    }
}

/// Re-issues the poll after every completed response.
async fn poll_loop(
    client: Client,
    endpoint: Url,
    tracking_id: String,
    initial_payload: Option<String>,
    suspend_timeout: Duration,
    events: mpsc::UnboundedSender<TransportEvent>,
    closed: Arc<AtomicBool>,
) {
    let mut body = initial_payload;
    let mut opened = false;

    loop {
        if closed.load(Ordering::SeqCst) {
            return;
        }

        let builder = match body.take() {
            Some(payload) => client.post(endpoint.clone()).body(payload),
            None => client.get(endpoint.clone()),
        };
        let builder = builder
            .header(TRANSPORT_HEADER, TransportKind::LongPoll.as_str())
            .header(TRACKING_HEADER, tracking_id.as_str());

        let response = match tokio::time::timeout(suspend_timeout, builder.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let _ = events.send(TransportEvent::Error(e.to_string()));
                return;
            }
            Err(_) => {
                trace!("poll suspend timed out, re-issuing");
                continue;
            }
        };
        if !response.status().is_success() {
            let _ = events.send(TransportEvent::Error(format!(
                "poll rejected with status {}",
                response.status()
            )));
            return;
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                let _ = events.send(TransportEvent::Error(e.to_string()));
                return;
            }
        };

        if !opened {
            opened = true;
            if events.send(TransportEvent::Opened).is_err() {
                return;
            }
        }
        if !text.is_empty() && events.send(TransportEvent::Data(text)).is_err() {
            return;
        }
    }
}

// ============================================================================
// CrossDomainPollTransport
// ============================================================================

/// Cross-domain polling for environments that cannot set request headers
/// or bodies: everything, payload included, travels on the query string.
pub struct CrossDomainPollTransport {
    client: Client,
    endpoint: Url,
    tracking_id: String,
    task: JoinHandle<()>,
    closed: Arc<AtomicBool>,
}

impl CrossDomainPollTransport {
    /// Opens the polling channel. The initial payload is attached to the
    /// first poll's query string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`](crate::Error::Http) if the client cannot be
    /// built.
    pub async fn connect(
        config: &TransportConfig,
        initial_payload: Option<String>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Self> {
        let client = build_client()?;
        let tracking_id = new_tracking_id();
        let closed = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(cross_domain_loop(
            client.clone(),
            config.endpoint.clone(),
            tracking_id.clone(),
            initial_payload,
            config.timeout,
            events,
            Arc::clone(&closed),
        ));

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            tracking_id,
            task,
            closed,
        })
    }
}

#[async_trait::async_trait]
impl Transport for CrossDomainPollTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::CrossDomainPoll
    }

    async fn send(&mut self, payload: String) -> Result<()> {
        let url = cross_domain_url(&self.endpoint, &self.tracking_id, Some(&payload));
        let response = self.client.get(url).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::transport(format!(
                "cross-domain push rejected with status {}",
                response.status()
            )))
        }
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.task.abort();
    }
}

/// Builds the poll URL, attaching transport metadata and the optional
/// payload as query parameters.
fn cross_domain_url(endpoint: &Url, tracking_id: &str, payload: Option<&str>) -> Url {
    let mut url = endpoint.clone();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair(TRANSPORT_HEADER, TransportKind::CrossDomainPoll.as_str());
        pairs.append_pair(TRACKING_HEADER, tracking_id);
        if let Some(payload) = payload {
            pairs.append_pair(POST_BODY_PARAM, payload);
        }
    }
    url
}

/// Like [`poll_loop`] but with query-string framing and no headers.
async fn cross_domain_loop(
    client: Client,
    endpoint: Url,
    tracking_id: String,
    initial_payload: Option<String>,
    suspend_timeout: Duration,
    events: mpsc::UnboundedSender<TransportEvent>,
    closed: Arc<AtomicBool>,
) {
    let mut body = initial_payload;
    let mut opened = false;

    loop {
        if closed.load(Ordering::SeqCst) {
            return;
        }

        let url = cross_domain_url(&endpoint, &tracking_id, body.take().as_deref());

        let response = match tokio::time::timeout(suspend_timeout, client.get(url).send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let _ = events.send(TransportEvent::Error(e.to_string()));
                return;
            }
            Err(_) => {
                trace!("cross-domain poll timed out, re-issuing");
                continue;
            }
        };
        if !response.status().is_success() {
            let _ = events.send(TransportEvent::Error(format!(
                "cross-domain poll rejected with status {}",
                response.status()
            )));
            return;
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                let _ = events.send(TransportEvent::Error(e.to_string()));
                return;
            }
        };

        if !opened {
            opened = true;
            if events.send(TransportEvent::Opened).is_err() {
                return;
            }
        }
        if !text.is_empty() && events.send(TransportEvent::Data(text)).is_err() {
            return;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_junk_filter_passes_clean_body() {
        let mut filter = JunkFilter::new();
        assert_eq!(
            filter.push(r#"{"responses":[]}"#).as_deref(),
            Some(r#"{"responses":[]}"#)
        );
        // once decided, later chunks pass straight through
        assert_eq!(filter.push("more").as_deref(), Some("more"));
    }

    #[test]
    fn test_junk_filter_strips_preamble() {
        let mut filter = JunkFilter::new();
        let body = format!("{JUNK_PREFIX} padding padding {JUNK_END}{{\"status\":1}}");
        assert_eq!(filter.push(&body).as_deref(), Some("{\"status\":1}"));
    }

    #[test]
    fn test_junk_filter_preamble_split_across_chunks() {
        let mut filter = JunkFilter::new();
        assert_eq!(filter.push("<!-- Welcome to the"), None);
        assert_eq!(filter.push(" Atmosphere Framework. x "), None);
        assert_eq!(filter.push("<!-- EOD -->payload").as_deref(), Some("payload"));
        assert_eq!(filter.push("next").as_deref(), Some("next"));
    }

    #[test]
    fn test_junk_filter_short_clean_prefix() {
        // shares a prefix with the padding comment but diverges
        let mut filter = JunkFilter::new();
        assert_eq!(filter.push("<!"), None);
        assert_eq!(filter.push("-- other -->data").as_deref(), Some("<!-- other -->data"));
    }

    #[test]
    fn test_junk_filter_sentinel_then_empty() {
        let mut filter = JunkFilter::new();
        let body = format!("{JUNK_PREFIX} {JUNK_END}");
        assert_eq!(filter.push(&body), None);
        assert_eq!(filter.push("later").as_deref(), Some("later"));
    }

    #[test]
    fn test_cross_domain_url_carries_payload() {
        let endpoint = Url::parse("http://localhost:8080/swagger").unwrap();
        let url = cross_domain_url(&endpoint, "track-1", Some(r#"{"handshake":{}}"#));

        let query = url.query().unwrap();
        assert!(query.contains("X-Atmosphere-Transport=jsonp"));
        assert!(query.contains("X-Atmosphere-tracking-id=track-1"));
        assert!(query.contains("X-Atmosphere-Post-Body="));
        // payload is percent-encoded
        assert!(query.contains("%22handshake%22"));
    }

    #[test]
    fn test_cross_domain_url_without_payload() {
        let endpoint = Url::parse("http://localhost:8080/swagger").unwrap();
        let url = cross_domain_url(&endpoint, "track-1", None);
        assert!(!url.query().unwrap().contains(POST_BODY_PARAM));
    }

    #[test]
    fn test_utf8_assembler_passes_ascii() {
        let mut assembler = Utf8Assembler::new();
        assert_eq!(assembler.push(b"hello").as_deref(), Some("hello"));
        assert_eq!(assembler.push(b" world").as_deref(), Some(" world"));
    }

    #[test]
    fn test_utf8_assembler_holds_split_character() {
        // "ok\u{e9}" is 6f 6b c3 a9; split between the two bytes of é
        let mut assembler = Utf8Assembler::new();
        assert_eq!(assembler.push(&[0x6f, 0x6b, 0xc3]).as_deref(), Some("ok"));
        assert_eq!(assembler.push(&[0xa9]).as_deref(), Some("é"));
    }

    #[test]
    fn test_utf8_assembler_split_at_chunk_start() {
        // a chunk that is nothing but a lead byte releases nothing yet
        let mut assembler = Utf8Assembler::new();
        assert_eq!(assembler.push(&[0xc2]), None);
        assert_eq!(assembler.push(&[0xa9, b't']).as_deref(), Some("\u{a9}t"));
    }

    #[test]
    fn test_utf8_assembler_invalid_bytes_degrade() {
        // a stray continuation byte can never complete; released lossily
        let mut assembler = Utf8Assembler::new();
        assert_eq!(
            assembler.push(&[0x61, 0x80, 0x62]).as_deref(),
            Some("a\u{FFFD}b")
        );
    }

    #[test]
    fn test_utf8_assembler_feeds_filter_whole_characters() {
        // end to end: a body with a multibyte character split across chunks
        // reaches the filter intact
        let body = r#"{"responses":[{"uuid":"u","status":200,"messageBody":"café"}]}"#;
        let bytes = body.as_bytes();
        let split = body.find("caf").unwrap() + 4; // inside the é sequence

        let mut assembler = Utf8Assembler::new();
        let mut filter = JunkFilter::new();
        let mut out = String::new();
        for chunk in [&bytes[..split], &bytes[split..]] {
            if let Some(text) = assembler.push(chunk) {
                if let Some(data) = filter.push(&text) {
                    out.push_str(&data);
                }
            }
        }
        assert_eq!(out, body);
    }

    /// Minimal HTTP/1.1 server: answers one request per connection with a
    /// fixed body and closes.
    async fn serve_bodies(listener: tokio::net::TcpListener, bodies: Vec<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        for body in bodies {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let mut seen = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = stream.read(&mut buf).await.expect("read");
                if n == 0 {
                    break;
                }
                seen.extend_from_slice(&buf[..n]);
                if seen.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.expect("write");
            let _ = stream.shutdown().await;
        }
    }

    #[tokio::test]
    async fn test_streaming_ceiling_cycles_without_closing() {
        use std::time::Duration;

        use tokio::sync::mpsc;
        use tokio::time::timeout;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = Url::parse(&format!("http://{}/s", listener.local_addr().unwrap())).unwrap();

        // first response blows through the ceiling, second is ordinary
        let oversized = "A".repeat(64);
        tokio::spawn(serve_bodies(
            listener,
            vec![oversized.clone(), "hello".to_string()],
        ));

        let config = TransportConfig::new(endpoint)
            .with_transport(TransportKind::ChunkedStream)
            .with_max_streaming_length(16);
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let mut transport = ChunkedStreamTransport::connect(&config, None, events_tx)
            .await
            .expect("connect");

        // collect everything until the natural close after the second body
        let mut received = String::new();
        let mut opened = 0;
        loop {
            let event = timeout(Duration::from_secs(5), events_rx.recv())
                .await
                .expect("event within deadline")
                .expect("channel open");
            match event {
                TransportEvent::Opened => opened += 1,
                TransportEvent::Data(data) => received.push_str(&data),
                TransportEvent::Closed => break,
                TransportEvent::Error(message) => panic!("unexpected error: {message}"),
            }
        }

        // the ceiling cycle was invisible: one open, both bodies delivered,
        // no error in between
        assert_eq!(opened, 1);
        assert_eq!(received, format!("{oversized}hello"));
        transport.close().await;
    }
}
