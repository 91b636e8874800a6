//! A relay provider that talks to the backend chat proxy.
//!
//! One call to [`ProxyRelay::send_request`] opens a single streaming
//! POST against the proxy and decodes its `text/event-stream` body into
//! an incrementally delivered assistant message.

#[macro_use]
extern crate tracing;

mod config;
mod io;
mod proto;
mod response;

use std::sync::Arc;

use mime::Mime;
use relaychat_model::{RelayError, RelayProvider, RelayRequest};
use reqwest::{Client, header};

pub use config::{RelayConfig, RelayConfigBuilder};
use io::{Chunks, EventStream, LineBuffer};
pub use response::ProxyResponse;

/// The HTTP client for the relay backend proxy.
#[derive(Clone, Debug)]
pub struct ProxyRelay {
    client: Client,
    config: Arc<RelayConfig>,
}

impl ProxyRelay {
    /// Creates a new `ProxyRelay` with the given configuration.
    #[inline]
    pub fn new(config: RelayConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }
}

impl RelayProvider for ProxyRelay {
    type Response = ProxyResponse;

    fn send_request(
        &self,
        req: &RelayRequest,
    ) -> impl Future<Output = Result<Self::Response, RelayError>> + Send + 'static
    {
        let payload = proto::create_request(req);
        let client = self.client.clone();
        let config = Arc::clone(&self.config);

        async move {
            // The credential must be obtained before any network call;
            // an unauthenticated request is never silently sent.
            let Some(token) = config.credentials.bearer_token().await else {
                return Err(RelayError::Unauthenticated);
            };

            let resp = client
                .post(format!("{}/api/chat", config.base_url))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::ACCEPT, "text/event-stream")
                .json(&payload)
                .send()
                .await
                .map_err(|err| RelayError::Network(err.to_string()))?;

            // Terminal error classes are decided on the status alone,
            // before reading a single body byte.
            let status = resp.status();
            match status.as_u16() {
                429 => return Err(RelayError::RateLimited),
                402 => return Err(RelayError::PaymentRequired),
                code if !status.is_success() => {
                    return Err(RelayError::Upstream(code));
                }
                _ => {}
            }

            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let is_event_stream = content_type
                .and_then(|v| v.parse().ok())
                .map(|m: Mime| m.essence_str() == "text/event-stream")
                .unwrap_or(false);
            if !is_event_stream {
                warn!("unexpected content type: {content_type:?}");
            }

            // Here we got a successful response.
            let chunks = Chunks::from_response(resp);
            let events = EventStream::new(LineBuffer::new(chunks));
            Ok(ProxyResponse::from_events(events))
        }
    }
}
