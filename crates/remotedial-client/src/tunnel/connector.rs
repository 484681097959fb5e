//! One connection attempt: dial, pre-flight hook, session.

use std::sync::Arc;

use remotedial_core::TransportConfig;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::authorizer::ConnectAuthorizer;
use super::dialer::{Dial, HandshakeResponse};
use super::error::{ConnectError, DialError};
use super::hook::OnConnect;
use super::session::{Session, SessionFactory};
use super::target::ProxyTarget;

/// How much of a rejected handshake's body is kept for diagnostics.
pub const HANDSHAKE_EXCERPT_LEN: u64 = 128;

/// Performs single connection attempts against a proxy.
pub struct Connector<D, F> {
    dialer: D,
    sessions: F,
}

impl<D, F> Connector<D, F>
where
    D: Dial,
    F: SessionFactory<D::Conn>,
{
    pub const fn new(dialer: D, sessions: F) -> Self {
        Self { dialer, sessions }
    }

    /// Run one attempt to completion.
    ///
    /// Returns the dial error, the hook error, or the session's termination
    /// result. Blocks for the session's lifetime on success.
    ///
    /// After a successful handshake the per-attempt context is cancelled on
    /// every exit path, and always after the connection (or the session
    /// owning it) has been released.
    pub async fn connect(
        &self,
        target: &ProxyTarget,
        authorizer: Arc<dyn ConnectAuthorizer>,
        transport: Option<&TransportConfig>,
        on_connect: Option<&dyn OnConnect>,
    ) -> Result<(), ConnectError> {
        info!(url = %target.url, "Connecting to proxy");

        let default_transport;
        let transport = match transport {
            Some(config) => config,
            None => {
                default_transport = TransportConfig::default();
                &default_transport
            }
        };

        let conn = match self.dialer.dial(target, transport).await {
            Ok(conn) => conn,
            Err(DialError::BadHandshake(mut response)) => {
                let status = response.status;
                let excerpt = read_excerpt(&mut response).await;
                let err = DialError::BadHandshake(response);
                error!(
                    error = %err,
                    url = %target.url,
                    status_code = status,
                    body = %excerpt,
                    "Invalid proxy response"
                );
                return Err(err.into());
            }
            Err(e) => return Err(e.into()),
        };

        let ctx = CancellationToken::new();
        let _cancel_on_exit = ctx.clone().drop_guard();
        self.serve_connection(conn, authorizer, on_connect, ctx)
            .await
    }

    /// Everything after the handshake. `conn` is consumed here, so it is
    /// always dropped before the caller's cancellation guard fires.
    async fn serve_connection(
        &self,
        conn: D::Conn,
        authorizer: Arc<dyn ConnectAuthorizer>,
        on_connect: Option<&dyn OnConnect>,
        ctx: CancellationToken,
    ) -> Result<(), ConnectError> {
        if let Some(hook) = on_connect {
            hook.on_connect(ctx).await.map_err(ConnectError::Hook)?;
        }

        let mut session = self.sessions.new_session(authorizer, conn);
        let (termination, result) = session.serve().await;
        session.close();
        drop(session);

        debug!(?termination, ok = result.is_ok(), "Session ended");
        result.map_err(ConnectError::from)
    }
}

/// Read the first bytes of a rejected handshake's body, then close it.
///
/// The body is dropped exactly once here whether the read succeeds, comes up
/// short, or fails. The excerpt is also stored on the response.
async fn read_excerpt(response: &mut HandshakeResponse) -> String {
    let mut buf = Vec::new();
    if let Some(body) = response.take_body() {
        let mut limited = body.take(HANDSHAKE_EXCERPT_LEN);
        if let Err(e) = limited.read_to_end(&mut buf).await {
            debug!(error = %e, "Failed to read proxy response body");
        }
    }
    let excerpt = String::from_utf8_lossy(&buf).into_owned();
    response.set_excerpt(excerpt.clone());
    excerpt
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::significant_drop_tightening,
    clippy::items_after_statements
)]
#[path = "connector_tests.rs"]
mod tests;
