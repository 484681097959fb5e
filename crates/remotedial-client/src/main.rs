//! remotedial Client
//!
//! Keeps an outbound WebSocket tunnel to a proxy open, retrying after a
//! fixed pause whenever an attempt fails.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use remotedial_client::tunnel::{
    ConnectAuthorizer, Connector, DenyAll, OnConnect, PassiveSessionFactory,
    ProxyTarget, StatusReporter, Supervisor, WsDialer,
};
use remotedial_core::config::{Config, load_config};

#[derive(Parser, Debug)]
#[command(name = "remotedial-client")]
#[command(version, about = "remotedial client - persistent outbound tunnel to a proxy")]
struct Args {
    /// Proxy WebSocket URL (e.g. "wss://proxy.example.com/connect")
    #[arg(long)]
    proxy_url: Option<String>,

    /// Extra handshake header as NAME=VALUE. Repeatable.
    #[arg(long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Settings file (JSON), merged over the global settings.
    #[arg(long, env = "REMOTEDIAL_CONFIG")]
    config: Option<PathBuf>,

    /// Seconds to pause after a failed attempt.
    #[arg(long)]
    retry_delay_secs: Option<u64>,

    /// Log level filter (e.g. "info", "debug", "warn").
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "REMOTEDIAL_LOG_JSON")]
    log_json: bool,
}

impl Args {
    /// CLI flags win over file and environment settings.
    fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.proxy_url {
            config.client.proxy_url = Some(url.clone());
        }
        config.client.headers.extend(self.headers.iter().cloned());
        if let Some(secs) = self.retry_delay_secs {
            config.client.retry_delay_secs = secs;
        }
        if let Some(level) = &self.log_level {
            config.client.log_level.clone_from(level);
        }
    }
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in {raw:?}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Passive sessions never open streams, so nothing is ever authorized.
/// Embedders with a multiplexing session pass their own authorizer.
fn session_authorizer() -> Arc<dyn ConnectAuthorizer> {
    Arc::new(DenyAll)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);

    let log_filter = format!("remotedial_client={}", config.client.log_level);
    remotedial_core::tracing_init::init_tracing(&log_filter, args.log_json)?;

    // Another component may already have installed a provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let proxy_url = config
        .client
        .proxy_url
        .clone()
        .context("No proxy URL configured (use --proxy-url or REMOTEDIAL_PROXY_URL)")?;
    let target = ProxyTarget {
        url: proxy_url,
        headers: config.client.headers.clone(),
    };
    let authorizer = session_authorizer();
    let supervisor = Supervisor::new(Connector::new(WsDialer, PassiveSessionFactory))
        .with_retry_delay(config.client.retry_delay());
    let status = StatusReporter::new(config.client.status_interval());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        url = %target.url,
        headers = target.headers.len(),
        retry_delay_secs = config.client.retry_delay_secs,
        "Starting remotedial-client"
    );

    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    // Notify systemd that the client is ready (unix only). The `true`
    // parameter unsets $NOTIFY_SOCKET so child processes can't notify it.
    #[cfg(unix)]
    sd_notify::notify(true, &[sd_notify::NotifyState::Ready])?;

    #[cfg(unix)]
    let sigterm_future = sigterm.recv();
    #[cfg(not(unix))]
    let sigterm_future = std::future::pending::<Option<()>>();

    // Dropping the loop on shutdown drops any in-flight attempt, which
    // releases its connection and cancels its context.
    tokio::select! {
        () = run_forever(&supervisor, &target, &authorizer, &config, &status) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C shutdown signal");
        }
        _ = sigterm_future => {
            info!("Received SIGTERM shutdown signal");
        }
    }

    info!("Client stopped");
    Ok(())
}

async fn run_forever(
    supervisor: &Supervisor<WsDialer, PassiveSessionFactory>,
    target: &ProxyTarget,
    authorizer: &Arc<dyn ConnectAuthorizer>,
    config: &Config,
    hook: &dyn OnConnect,
) {
    loop {
        supervisor
            .client_connect(
                target,
                Arc::clone(authorizer),
                Some(&config.transport),
                Some(hook),
            )
            .await;
    }
}
