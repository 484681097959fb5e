//! Session collaborator seam.
//!
//! A session owns the connection once the handshake and pre-flight hook are
//! done. Multiplexing sessions plug in through [`SessionFactory`];
//! [`PassiveSession`] only keeps the tunnel alive.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::authorizer::ConnectAuthorizer;
use super::error::SessionError;

/// Why a session stopped serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The proxy sent a close frame.
    RemoteClose,
    /// [`Session::close`] was called while serving.
    LocalClose,
    /// The stream ended without a close frame.
    StreamEnded,
    /// The transport failed.
    Failed,
}

/// Owns an established connection for its lifetime.
#[async_trait::async_trait]
pub trait Session: Send {
    /// Serve until the connection ends. Blocks for the tunnel's lifetime.
    async fn serve(&mut self) -> (Termination, Result<(), SessionError>);

    /// Ask the session to shut down. Idempotent; safe after `serve` returned.
    ///
    /// `serve` holds the exclusive borrow while it runs, so this cannot be
    /// reached mid-serve. Sessions that support early termination from
    /// another task expose a separate handle, as
    /// [`PassiveSession::close_handle`] does.
    fn close(&mut self);
}

/// Builds a session from the authorizer and an established connection.
pub trait SessionFactory<C>: Send + Sync {
    type Session: Session;

    fn new_session(&self, authorizer: Arc<dyn ConnectAuthorizer>, conn: C) -> Self::Session;
}

impl<C, S, F> SessionFactory<C> for F
where
    F: Fn(Arc<dyn ConnectAuthorizer>, C) -> S + Send + Sync,
    S: Session,
{
    type Session = S;

    fn new_session(&self, authorizer: Arc<dyn ConnectAuthorizer>, conn: C) -> S {
        self(authorizer, conn)
    }
}

/// Keeps the tunnel open without opening streams.
///
/// Pings are answered by the transport. Data frames are logged and dropped.
pub struct PassiveSession<S> {
    ws: WebSocketStream<S>,
    shutdown: CancellationToken,
}

impl<S> PassiveSession<S> {
    pub fn new(ws: WebSocketStream<S>) -> Self {
        Self {
            ws,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that ends a running [`serve`](Session::serve) with
    /// [`Termination::LocalClose`] when cancelled. Usable from any task.
    pub fn close_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

#[async_trait::async_trait]
impl<S> Session for PassiveSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn serve(&mut self) -> (Termination, Result<(), SessionError>) {
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    if let Err(e) = self.ws.close(None).await {
                        debug!(error = %e, "Close frame not delivered");
                    }
                    return (Termination::LocalClose, Ok(()));
                }
                msg = self.ws.next() => match msg {
                    Some(Ok(Message::Close(frame))) => {
                        let Some(frame) = frame else {
                            info!("Proxy closed the tunnel");
                            return (Termination::RemoteClose, Ok(()));
                        };
                        info!(code = %frame.code, reason = %frame.reason, "Proxy closed the tunnel");
                        if matches!(frame.code, CloseCode::Normal | CloseCode::Away) {
                            return (Termination::RemoteClose, Ok(()));
                        }
                        return (
                            Termination::RemoteClose,
                            Err(SessionError::Protocol(format!(
                                "proxy closed tunnel with {}: {}",
                                frame.code, frame.reason
                            ))),
                        );
                    }
                    Some(Ok(Message::Binary(data))) => {
                        debug!(bytes = data.len(), "Discarding binary frame");
                    }
                    Some(Ok(Message::Text(text))) => {
                        debug!(bytes = text.len(), "Discarding text frame");
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return (Termination::Failed, Err(SessionError::Connection(e))),
                    None => return (Termination::StreamEnded, Ok(())),
                },
            }
        }
    }

    fn close(&mut self) {
        self.shutdown.cancel();
    }
}

/// Builds [`PassiveSession`]s.
///
/// Passive sessions never open streams, so the authorizer is never consulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassiveSessionFactory;

impl<S> SessionFactory<WebSocketStream<S>> for PassiveSessionFactory
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    type Session = PassiveSession<S>;

    fn new_session(
        &self,
        _authorizer: Arc<dyn ConnectAuthorizer>,
        conn: WebSocketStream<S>,
    ) -> PassiveSession<S> {
        PassiveSession::new(conn)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use tokio::io::DuplexStream;
    use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Role};

    async fn pair() -> (PassiveSession<DuplexStream>, WebSocketStream<DuplexStream>) {
        let (client, server) = tokio::io::duplex(4096);
        let client = WebSocketStream::from_raw_socket(client, Role::Client, None).await;
        let server = WebSocketStream::from_raw_socket(server, Role::Server, None).await;
        (PassiveSession::new(client), server)
    }

    #[tokio::test]
    async fn normal_remote_close_is_clean() {
        let (mut session, mut server) = pair().await;
        server
            .send(Message::Binary(vec![1, 2, 3]))
            .await
            .unwrap();
        server
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "bye".into(),
            })))
            .await
            .unwrap();

        let (reason, result) = session.serve().await;
        assert_eq!(reason, Termination::RemoteClose);
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn abnormal_close_code_is_protocol_error() {
        let (mut session, mut server) = pair().await;
        server
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::Policy,
                reason: "kicked".into(),
            })))
            .await
            .unwrap();

        let (reason, result) = session.serve().await;
        assert_eq!(reason, Termination::RemoteClose);
        assert!(matches!(result, Err(SessionError::Protocol(msg)) if msg.contains("kicked")));
    }

    #[tokio::test]
    async fn dropped_peer_ends_serve() {
        let (mut session, server) = pair().await;
        drop(server);

        let (reason, result) = session.serve().await;
        // Depending on timing the transport reports EOF or a reset.
        match reason {
            Termination::StreamEnded => assert!(result.is_ok()),
            Termination::Failed => assert!(result.is_err()),
            other => panic!("unexpected termination {other:?}"),
        }
    }

    #[tokio::test]
    async fn close_before_serve_returns_local_close() {
        let (mut session, _server) = pair().await;
        session.close();
        session.close();

        let (reason, result) = session.serve().await;
        assert_eq!(reason, Termination::LocalClose);
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn close_handle_stops_running_serve() {
        let (mut session, mut server) = pair().await;
        let handle = session.close_handle();

        let closer = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            handle.cancel();
        });

        let (reason, result) = session.serve().await;
        closer.await.unwrap();
        assert_eq!(reason, Termination::LocalClose);
        assert!(result.is_ok());

        // The peer is told with a close frame.
        let frame = server.next().await.unwrap().unwrap();
        assert!(matches!(frame, Message::Close(_)));

        // A later close() is a no-op.
        session.close();
    }
}
