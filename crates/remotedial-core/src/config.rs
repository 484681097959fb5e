//! Configuration resolution for remotedial.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/remotedial/settings.json)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Complete remotedial configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub transport: TransportConfig,
}

/// Tunnel client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Proxy endpoint, e.g. `wss://proxy.example.com/connect`.
    pub proxy_url: Option<String>,
    /// Extra headers sent with the opening handshake.
    pub headers: HashMap<String, String>,
    /// Pause after a failed attempt (seconds).
    pub retry_delay_secs: u64,
    /// How often a connected tunnel logs its uptime (seconds).
    pub status_interval_secs: u64,
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            proxy_url: None,
            headers: HashMap::new(),
            retry_delay_secs: 5,
            status_interval_secs: 60,
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub const fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }
}

/// WebSocket dial settings.
///
/// Passed to each connection attempt. When a caller has none, the attempt
/// builds `TransportConfig::default()` for itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TransportConfig {
    /// Upper bound on TCP connect + TLS + upgrade. `None` waits forever.
    pub handshake_timeout_secs: Option<u64>,
    /// Maximum size of an incoming message. `None` uses the transport default.
    pub max_message_size: Option<usize>,
    /// Maximum size of a single incoming frame. `None` uses the transport default.
    pub max_frame_size: Option<usize>,
    /// Set `TCP_NODELAY` on the underlying socket.
    pub disable_nagle: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_secs: Some(45),
            max_message_size: None,
            max_frame_size: None,
            disable_nagle: false,
        }
    }
}

impl TransportConfig {
    pub fn handshake_timeout(&self) -> Option<Duration> {
        self.handshake_timeout_secs.map(Duration::from_secs)
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let global = global_config_path().filter(|p| p.exists());
    let mut config = load_config_files(global.as_deref(), explicit)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Merge the global file and then the explicit file, key by key.
///
/// A key missing from a later file keeps the earlier value; only keys absent
/// from every file fall back to defaults. An explicit file must exist.
fn load_config_files(global: Option<&Path>, explicit: Option<&Path>) -> Result<Config> {
    let mut merged = Value::Object(Map::new());
    for path in global.into_iter().chain(explicit) {
        merge_json(&mut merged, read_config_value(path)?);
    }
    serde_json::from_value(merged)
        .map_err(|e| Error::Config(format!("Invalid configuration: {e}")))
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".remotedial").join("settings.json"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/remotedial/settings.json"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("remotedial").join("settings.json"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

fn read_config_value(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })?;
    if !value.is_object() {
        return Err(Error::Config(format!(
            "Config file {} must contain a JSON object",
            path.display()
        )));
    }
    tracing::debug!(path = %path.display(), "Loaded config file");
    Ok(value)
}

/// Objects merge recursively; any other overlay value replaces the base.
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("REMOTEDIAL_PROXY_URL") {
        config.client.proxy_url = Some(val);
    }
    if let Some(val) = lookup("REMOTEDIAL_RETRY_DELAY_SECS") {
        if let Ok(n) = val.parse() {
            config.client.retry_delay_secs = n;
        }
    }
    if let Some(val) = lookup("REMOTEDIAL_HANDSHAKE_TIMEOUT_SECS") {
        if let Ok(n) = val.parse() {
            config.transport.handshake_timeout_secs = Some(n);
        }
    }
    if let Some(val) = lookup("REMOTEDIAL_LOG_LEVEL") {
        config.client.log_level = val;
    }
}
