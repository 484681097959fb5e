//! Single attempt with failure logging and a fixed pause.

use std::sync::Arc;
use std::time::Duration;

use remotedial_core::TransportConfig;
use tokio::time::sleep;
use tracing::error;

use super::authorizer::ConnectAuthorizer;
use super::connector::Connector;
use super::dialer::Dial;
use super::hook::OnConnect;
use super::session::SessionFactory;
use super::target::ProxyTarget;

/// Pause after a failed attempt.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Wraps one [`Connector`] attempt. Holds no state between calls.
///
/// Calling [`client_connect`](Self::client_connect) in a loop gives
/// retry-forever behaviour; the loop, and any cancellation around it,
/// belongs to the caller.
pub struct Supervisor<D, F> {
    connector: Connector<D, F>,
    retry_delay: Duration,
}

impl<D, F> Supervisor<D, F>
where
    D: Dial,
    F: SessionFactory<D::Conn>,
{
    pub const fn new(connector: Connector<D, F>) -> Self {
        Self {
            connector,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub const fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// The wrapped connector, for callers that need the precise error.
    pub const fn connector(&self) -> &Connector<D, F> {
        &self.connector
    }

    /// Make one attempt. On any failure, log it and pause before returning.
    pub async fn client_connect(
        &self,
        target: &ProxyTarget,
        authorizer: Arc<dyn ConnectAuthorizer>,
        transport: Option<&TransportConfig>,
        on_connect: Option<&dyn OnConnect>,
    ) {
        if let Err(e) = self
            .connector
            .connect(target, authorizer, transport, on_connect)
            .await
        {
            error!(error = %e, "Failed to connect to proxy");
            sleep(self.retry_delay).await;
        }
    }
}
