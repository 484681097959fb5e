//! Tunnel client error types.

use std::time::Duration;

use tokio_tungstenite::tungstenite;

use super::dialer::HandshakeResponse;

/// Failure to establish the underlying connection.
#[derive(Debug, thiserror::Error)]
pub enum DialError {
    /// The proxy answered the upgrade request with something other than a
    /// valid WebSocket handshake. Carries the HTTP response for diagnostics.
    #[error("bad handshake (status {})", .0.status)]
    BadHandshake(HandshakeResponse),

    #[error("invalid proxy request: {0}")]
    Request(String),

    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(#[from] tungstenite::Error),
}

/// Abnormal termination of an established session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("connection error: {0}")]
    Connection(#[from] tungstenite::Error),

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Outcome of a failed connection attempt.
///
/// Keeps the three failure kinds apart for callers that wrap the
/// supervisor in their own retry policy.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    Dial(#[from] DialError),

    #[error("on-connect hook failed: {0:#}")]
    Hook(anyhow::Error),

    #[error("session terminated: {0}")]
    Session(#[from] SessionError),
}
