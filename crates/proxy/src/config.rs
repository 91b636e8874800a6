//! Environment-based proxy configuration.

use std::collections::HashSet;
use std::env;
use std::fmt::Debug;

/// A required environment variable is missing.
#[derive(Debug, thiserror::Error)]
#[error("{0} environment variable is not set")]
pub struct ConfigError(&'static str);

/// Proxy configuration, loaded from `RELAYCHAT_*` environment
/// variables.
#[derive(Clone)]
pub struct ProxyConfig {
    /// The address to listen on.
    pub listen_addr: String,
    /// Base URL of the upstream completion provider.
    pub upstream_base_url: String,
    /// API key for the upstream provider.
    pub upstream_api_key: String,
    /// The model to request from the upstream.
    pub model: String,
    /// Bearer keys accepted from clients.
    pub allowed_keys: HashSet<String>,
}

impl ProxyConfig {
    /// Loads the configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let upstream_base_url = env::var("RELAYCHAT_UPSTREAM_BASE_URL")
            .map_err(|_| ConfigError("RELAYCHAT_UPSTREAM_BASE_URL"))?;
        let upstream_api_key = env::var("RELAYCHAT_UPSTREAM_API_KEY")
            .map_err(|_| ConfigError("RELAYCHAT_UPSTREAM_API_KEY"))?;
        let allowed_keys = env::var("RELAYCHAT_ALLOWED_KEYS")
            .map_err(|_| ConfigError("RELAYCHAT_ALLOWED_KEYS"))?
            .split(',')
            .map(|key| key.trim().to_owned())
            .filter(|key| !key.is_empty())
            .collect();
        Ok(Self {
            listen_addr: env::var("RELAYCHAT_LISTEN_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:8787".to_owned()),
            upstream_base_url,
            upstream_api_key,
            model: env::var("RELAYCHAT_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_owned()),
            allowed_keys,
        })
    }
}

impl Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("listen_addr", &self.listen_addr)
            .field("upstream_base_url", &self.upstream_base_url)
            .field("upstream_api_key", &"<redacted>")
            .field("model", &self.model)
            .field("allowed_keys", &format!("<{}>", self.allowed_keys.len()))
            .finish()
    }
}
