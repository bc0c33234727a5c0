//! Persistent socket transport.
//!
//! Full-duplex delivery over a single long-lived WebSocket. The HTTP(S)
//! endpoint is rewritten to the matching ws(s) scheme; a reader task pumps
//! inbound frames onto the connection event channel while sends go straight
//! through the write half.
//!
//! A connection that cannot be established at all is reported as
//! [`Error::TransportUnavailable`], which is what drives the manager's
//! fallback walk.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::config::{TransportConfig, TransportKind};
use super::{Transport, TransportEvent};

// ============================================================================
// Constants
// ============================================================================

/// Ceiling on socket establishment, distinct from the poll suspend timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// WebSocketTransport
// ============================================================================

/// Live persistent socket.
///
/// Owns the write half; the read half lives in a spawned reader task that
/// emits [`TransportEvent`]s until the stream ends.
pub struct WebSocketTransport {
    sink: SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>,
    reader: JoinHandle<()>,
}

impl WebSocketTransport {
    /// Establishes the socket against the configured endpoint.
    ///
    /// Emits [`TransportEvent::Opened`] on `events` before returning, so the
    /// first event the manager observes is the open notification.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransportUnavailable`] if the socket cannot be
    /// established (refused, timed out, or bad scheme).
    pub async fn connect(
        config: &TransportConfig,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Self> {
        let url = ws_endpoint(&config.endpoint)?;
        debug!(url = %url, "opening websocket");

        let connect = connect_async(url.as_str());
        let (stream, _response) = match tokio::time::timeout(CONNECT_TIMEOUT, connect).await {
            Ok(Ok(established)) => established,
            Ok(Err(e)) => {
                warn!(error = %e, "websocket failed to open");
                return Err(Error::transport_unavailable(TransportKind::WebSocket));
            }
            Err(_) => {
                warn!(timeout_secs = CONNECT_TIMEOUT.as_secs(), "websocket open timed out");
                return Err(Error::transport_unavailable(TransportKind::WebSocket));
            }
        };

        let (sink, read) = stream.split();
        let reader = tokio::spawn(read_loop(read, events.clone()));

        let _ = events.send(TransportEvent::Opened);

        Ok(Self { sink, reader })
    }
}

#[async_trait::async_trait]
impl Transport for WebSocketTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::WebSocket
    }

    async fn send(&mut self, payload: String) -> Result<()> {
        trace!(bytes = payload.len(), "websocket send");
        self.sink
            .send(Message::Text(payload.into()))
            .await
            .map_err(|e| Error::transport(format!("websocket send failed: {e}")))
    }

    async fn close(&mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
        self.reader.abort();
    }
}

// ============================================================================
// Reader Task
// ============================================================================

type WsRead = futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Pumps inbound frames onto the event channel until the stream ends.
async fn read_loop(mut read: WsRead, events: mpsc::UnboundedSender<TransportEvent>) {
    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                trace!(bytes = text.len(), "websocket frame");
                if events.send(TransportEvent::Data(text.to_string())).is_err() {
                    return;
                }
            }
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.into()) {
                Ok(text) => {
                    if events.send(TransportEvent::Data(text)).is_err() {
                        return;
                    }
                }
                Err(_) => {
                    warn!("non-utf8 binary frame dropped");
                }
            },
            Ok(Message::Close(_)) => {
                debug!("websocket closed by peer");
                let _ = events.send(TransportEvent::Closed);
                return;
            }
            // ping/pong handled by the library
            Ok(_) => {}
            Err(e) => {
                let _ = events.send(TransportEvent::Error(e.to_string()));
                return;
            }
        }
    }

    let _ = events.send(TransportEvent::Closed);
}

// ============================================================================
// Endpoint Rewrite
// ============================================================================

/// Rewrites an http(s) endpoint to the matching ws(s) scheme.
fn ws_endpoint(endpoint: &Url) -> Result<Url> {
    let mut url = endpoint.clone();
    let scheme = match endpoint.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(Error::invalid_endpoint(format!(
                "unsupported scheme for websocket: {other}"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| Error::invalid_endpoint("scheme rewrite rejected"))?;
    Ok(url)
}

// ============================================================================
// Tests
// ============================================================================
