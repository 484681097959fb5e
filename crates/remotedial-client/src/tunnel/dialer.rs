//! Transport dial primitive.
//!
//! [`Dial`] is the seam the connector dials through; [`WsDialer`] is the
//! production implementation on top of `tokio-tungstenite`.

use std::fmt;
use std::io::Cursor;

use remotedial_core::TransportConfig;
use tokio::io::AsyncRead;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async_with_config, tungstenite};
use tracing::debug;

use super::error::DialError;
use super::target::ProxyTarget;

/// An established tunnel connection.
pub type WsConnection = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Readable body of a rejected handshake response.
pub type ResponseBody = Box<dyn AsyncRead + Send + Sync + Unpin>;

/// HTTP response returned by the proxy instead of a WebSocket upgrade.
///
/// The body is an open stream until the connector drains its first bytes;
/// afterwards only [`excerpt`](Self::excerpt) remains.
pub struct HandshakeResponse {
    pub status: u16,
    body: Option<ResponseBody>,
    excerpt: Option<String>,
}

impl HandshakeResponse {
    pub fn new(status: u16, body: impl AsyncRead + Send + Sync + Unpin + 'static) -> Self {
        Self {
            status,
            body: Some(Box::new(body)),
            excerpt: None,
        }
    }

    /// Leading bytes of the response body, once they have been read.
    pub fn excerpt(&self) -> Option<&str> {
        self.excerpt.as_deref()
    }

    pub(crate) fn take_body(&mut self) -> Option<ResponseBody> {
        self.body.take()
    }

    pub(crate) fn set_excerpt(&mut self, excerpt: String) {
        self.excerpt = Some(excerpt);
    }
}

impl fmt::Debug for HandshakeResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeResponse")
            .field("status", &self.status)
            .field("body_open", &self.body.is_some())
            .field("excerpt", &self.excerpt)
            .finish()
    }
}

/// Opens one connection to the proxy.
#[async_trait::async_trait]
pub trait Dial: Send + Sync {
    type Conn: Send;

    /// On [`DialError::BadHandshake`] the response body is still open and
    /// must be drained by the caller.
    async fn dial(
        &self,
        target: &ProxyTarget,
        config: &TransportConfig,
    ) -> Result<Self::Conn, DialError>;
}

/// WebSocket dialer supporting `ws://` and `wss://`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsDialer;

fn ws_config(config: &TransportConfig) -> WebSocketConfig {
    let mut ws = WebSocketConfig::default();
    if config.max_message_size.is_some() {
        ws.max_message_size = config.max_message_size;
    }
    if config.max_frame_size.is_some() {
        ws.max_frame_size = config.max_frame_size;
    }
    ws
}

fn build_request(
    target: &ProxyTarget,
) -> Result<tungstenite::handshake::client::Request, DialError> {
    let mut request = target
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| DialError::Request(format!("{}: {e}", target.url)))?;

    for (name, value) in &target.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| DialError::Request(format!("header name {name:?}: {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| DialError::Request(format!("header {name:?} value: {e}")))?;
        request.headers_mut().insert(header_name, header_value);
    }
    Ok(request)
}

#[async_trait::async_trait]
impl Dial for WsDialer {
    type Conn = WsConnection;

    async fn dial(
        &self,
        target: &ProxyTarget,
        config: &TransportConfig,
    ) -> Result<WsConnection, DialError> {
        let request = build_request(target)?;
        let handshake =
            connect_async_with_config(request, Some(ws_config(config)), config.disable_nagle);

        let result = match config.handshake_timeout() {
            Some(limit) => tokio::time::timeout(limit, handshake)
                .await
                .map_err(|_| DialError::Timeout(limit))?,
            None => handshake.await,
        };

        match result {
            Ok((ws, response)) => {
                debug!(url = %target.url, status = response.status().as_u16(), "Handshake complete");
                Ok(ws)
            }
            Err(tungstenite::Error::Http(response)) => {
                let status = response.status().as_u16();
                let body = response.into_body().unwrap_or_default();
                Err(DialError::BadHandshake(HandshakeResponse::new(
                    status,
                    Cursor::new(body),
                )))
            }
            Err(e) => Err(DialError::Transport(e)),
        }
    }
}
