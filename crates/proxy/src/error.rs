//! Proxy error taxonomy and its HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors a relay request can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The request payload failed validation.
    #[error("{0}")]
    InvalidRequest(String),
    /// The caller presented no valid credential.
    #[error("{0}")]
    Unauthenticated(&'static str),
    /// The upstream is rate limiting us.
    #[error("rate limit exceeded, please try again later")]
    RateLimited,
    /// The upstream demands payment.
    #[error("payment required")]
    PaymentRequired,
    /// Any other upstream failure.
    #[error("upstream request failed (status {0})")]
    Upstream(u16),
    /// The upstream could not be reached.
    #[error("failed to reach the upstream provider")]
    Transport(#[from] reqwest::Error),
}

impl ProxyError {
    fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ProxyError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
            ProxyError::Upstream(_) | ProxyError::Transport(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("relay request failed: {self:?}");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
