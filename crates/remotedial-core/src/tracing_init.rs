//! Tracing subscriber setup shared by the remotedial binaries.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Error, Result};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` applies
/// (e.g. `"remotedial_client=info"`). With `log_json` every line is a JSON
/// object, ready for log aggregation.
pub fn init_tracing(default_filter: &str, log_json: bool) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let json_layer = log_json.then(|| fmt::layer().json());
    let text_layer = (!log_json).then(fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))
}
