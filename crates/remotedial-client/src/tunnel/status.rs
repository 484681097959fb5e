//! Pre-flight hook that reports tunnel uptime while the attempt lasts.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::hook::OnConnect;

/// Logs "Connected to proxy", then uptime every `interval` until the
/// attempt's context is cancelled. A zero interval disables the uptime log.
#[derive(Debug, Clone, Copy)]
pub struct StatusReporter {
    interval: Duration,
}

impl StatusReporter {
    pub const fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

#[async_trait::async_trait]
impl OnConnect for StatusReporter {
    async fn on_connect(&self, ctx: CancellationToken) -> anyhow::Result<()> {
        info!("Connected to proxy");
        spawn_status_task(ctx, self.interval);
        Ok(())
    }
}

/// Spawn the uptime logger. Returns `None` when `interval` is zero.
pub fn spawn_status_task(ctx: CancellationToken, interval: Duration) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        return None;
    }
    Some(tokio::spawn(async move {
        let started = Instant::now();
        let mut timer = tokio::time::interval(interval);
        timer.tick().await; // Skip first immediate tick

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    info!(uptime_secs = started.elapsed().as_secs(), "Tunnel up");
                }
                () = ctx.cancelled() => {
                    debug!(uptime_secs = started.elapsed().as_secs(), "Status task stopping");
                    return;
                }
            }
        }
    }))
}
