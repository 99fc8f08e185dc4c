//! Receive-only WebSocket transport
//!
//! The server pushes JSON text frames on `ws://host:port/socket/`; the client
//! never sends application data. [`ConnectionFactory`] and [`FrameReader`]
//! abstract the socket so the session can be tested without a network.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::{ControlPanelError, Result};

/// Source of text frames from the server
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait FrameReader: Send {
    /// Next text frame
    ///
    /// Returns `Ok(None)` once the server closed the connection.
    async fn next_frame(&mut self) -> Result<Option<String>>;
}

/// Opens push connections to the server
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait ConnectionFactory: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn FrameReader>>;
}

/// [`FrameReader`] over a tungstenite stream
pub struct WebSocketFrameReader {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FrameReader for WebSocketFrameReader {
    async fn next_frame(&mut self) -> Result<Option<String>> {
        while let Some(message) = self.stream.next().await {
            let message =
                message.map_err(|e| ControlPanelError::WebSocket(format!("Read failed: {}", e)))?;
            match message {
                Message::Text(text) => return Ok(Some(text.as_str().to_string())),
                Message::Close(frame) => {
                    tracing::debug!("Server closed the socket: {:?}", frame);
                    return Ok(None);
                }
                Message::Binary(data) => {
                    tracing::trace!("Skipping binary frame of {} bytes", data.len());
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }
}

/// Production [`ConnectionFactory`] using tokio-tungstenite
///
/// The session cookie of the HTTP client is not shared with the socket, so
/// the handshake carries the Basic credentials itself when they are known.
#[derive(Default, Clone)]
pub struct WebSocketConnectionFactory {
    authorization: Option<String>,
}

impl WebSocketConnectionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send this `Authorization` header value with every handshake
    pub fn with_authorization(mut self, authorization: String) -> Self {
        self.authorization = Some(authorization);
        self
    }
}

#[async_trait]
impl ConnectionFactory for WebSocketConnectionFactory {
    async fn connect(&self, url: &str) -> Result<Box<dyn FrameReader>> {
        tracing::debug!("Connecting to {}", url);

        let mut request = url
            .into_client_request()
            .map_err(|e| ControlPanelError::WebSocket(format!("Invalid URL {}: {}", url, e)))?;
        if let Some(authorization) = &self.authorization {
            let value = HeaderValue::from_str(authorization).map_err(|e| {
                ControlPanelError::Authentication(format!("Invalid authorization header: {}", e))
            })?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (stream, response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| {
                ControlPanelError::WebSocket(format!("Failed to connect to {}: {}", url, e))
            })?;

        tracing::debug!("WebSocket handshake with {} -> {}", url, response.status());
        Ok(Box::new(WebSocketFrameReader { stream }))
    }
}
