use std::fmt::Debug;
use std::sync::Arc;

use relaychat_model::CredentialProvider;

/// Builder for [`RelayConfig`].
#[derive(Clone)]
pub struct RelayConfigBuilder {
    credentials: Arc<dyn CredentialProvider>,
    base_url: Option<String>,
}

impl RelayConfigBuilder {
    /// Creates a builder with the given credential provider.
    #[inline]
    pub fn with_credentials(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            credentials,
            base_url: None,
        }
    }

    /// Sets a custom base URL for the relay proxy.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> RelayConfig {
        RelayConfig {
            credentials: self.credentials,
            base_url: self
                .base_url
                .unwrap_or_else(|| "http://127.0.0.1:8787".to_string()),
        }
    }
}

impl Debug for RelayConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfigBuilder")
            .field("credentials", &"<provider>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Configuration for the relay proxy client.
#[derive(Clone)]
pub struct RelayConfig {
    pub(crate) credentials: Arc<dyn CredentialProvider>,
    pub(crate) base_url: String,
}

impl Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("credentials", &"<provider>")
            .field("base_url", &self.base_url)
            .finish()
    }
}
