//! Connection target: where to dial and what to send with the handshake.

use std::collections::HashMap;

/// Proxy endpoint plus the headers sent with the opening handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyTarget {
    /// `ws://` or `wss://` URL of the proxy.
    pub url: String,
    pub headers: HashMap<String, String>,
}

impl ProxyTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
        }
    }

    /// Add a handshake header, replacing any previous value for `name`.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_header_replaces_existing_key() {
        let target = ProxyTarget::new("ws://proxy/connect")
            .with_header("X-Tunnel-Token", "old")
            .with_header("X-Tunnel-Token", "new");

        assert_eq!(target.headers.len(), 1);
        assert_eq!(target.headers["X-Tunnel-Token"], "new");
    }
}
