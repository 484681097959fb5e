//! Pre-flight hook run between the handshake and the session.

use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Called once per successful handshake, before the session starts.
///
/// `ctx` is cancelled when the attempt ends, however it ends. Tasks spawned
/// from the hook should select on `ctx.cancelled()` so they don't outlive
/// the connection. Returning an error aborts the attempt.
#[async_trait::async_trait]
pub trait OnConnect: Send + Sync {
    async fn on_connect(&self, ctx: CancellationToken) -> anyhow::Result<()>;
}

#[async_trait::async_trait]
impl<F, Fut> OnConnect for F
where
    F: Fn(CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn on_connect(&self, ctx: CancellationToken) -> anyhow::Result<()> {
        self(ctx).await
    }
}
