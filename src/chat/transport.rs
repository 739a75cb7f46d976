//! Chat transports.
//!
//! A [`Connector`] produces one [`Transport`] per `open`.  The WebSocket implementation is the
//! one the binary uses; tests substitute scripted transports.

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use crate::error::{Error, Result};

const DEFAULT_WS_URL: &str = "ws://localhost:8000/chat/ws/chat";

/// Something that happened on a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame.
    Frame(String),
    /// The transport terminated, with a human-readable reason.
    Closed(String),
}

/// One live, bidirectional text connection.
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Write one text frame.
    async fn send(&mut self, text: String) -> Result<()>;

    /// Wait for the next event.  After `Closed` the transport is finished.
    async fn recv(&mut self) -> TransportEvent;

    /// Tear the transport down.
    async fn close(&mut self) -> Result<()>;
}

/// Opens transports.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    /// Open a new transport.  Resolves once the transport is ready for the handshake.
    async fn connect(&self) -> Result<Box<dyn Transport>>;
}

/// Connects to the backend's chat WebSocket.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: Url,
}

impl WebSocketConnector {
    /// Connect to `url`, or CONFIDANT_WS_URL, or the localhost default.
    pub fn new(url: Option<String>) -> Result<Self> {
        let url = match url {
            Some(url) => url,
            None => std::env::var("CONFIDANT_WS_URL").unwrap_or_else(|_| DEFAULT_WS_URL.to_string()),
        };
        let url = Url::parse(&url)?;
        match url.scheme() {
            "ws" | "wss" => Ok(Self { url }),
            scheme => Err(Error::validation(
                format!("chat URL must use ws or wss, not {scheme}"),
                Some("ws_url".to_string()),
            )),
        }
    }

    /// The endpoint this connector dials.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait::async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>> {
        tracing::debug!(url = %self.url, "connecting chat socket");
        let (stream, _) = connect_async(self.url.as_str()).await.map_err(|e| {
            Error::transport(format!("failed to connect to {}: {e}", self.url), Some(Box::new(e)))
        })?;
        Ok(Box::new(WebSocketTransport { stream }))
    }
}

/// A chat transport over tokio-tungstenite.
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait::async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        self.stream.send(WsMessage::Text(text)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> TransportEvent {
        loop {
            match self.stream.next().await {
                Some(Ok(WsMessage::Text(text))) => return TransportEvent::Frame(text),
                Some(Ok(WsMessage::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => return TransportEvent::Frame(text),
                    Err(_) => {
                        tracing::warn!("dropping non-UTF-8 binary frame");
                    }
                },
                Some(Ok(WsMessage::Close(frame))) => {
                    let reason = frame
                        .map(|f| close_reason(u16::from(f.code), &f.reason))
                        .unwrap_or_else(|| "closed by server".to_string());
                    return TransportEvent::Closed(reason);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return TransportEvent::Closed(e.to_string()),
                None => return TransportEvent::Closed("connection lost".to_string()),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// Render a close frame the way it appears in the chat log: the server's reason when it gave
/// one, otherwise the close code.
fn close_reason(code: u16, reason: &str) -> String {
    if reason.is_empty() {
        format!("code {code}")
    } else {
        reason.to_string()
    }
}
