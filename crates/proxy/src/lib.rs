//! The relay backend proxy.
//!
//! A stateless server function: it authenticates the caller, validates
//! the chat payload, forwards it to the upstream completion provider
//! with streaming enabled, and pipes the upstream byte stream back
//! unmodified so the client decoder sees the exact chunk-arrival
//! semantics the upstream produced.

#[macro_use]
extern crate tracing;

pub mod config;
pub mod error;
mod relay;
mod validate;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::config::ProxyConfig;

/// Shared state for the request handlers.
#[derive(Clone)]
pub struct AppState {
    pub(crate) config: Arc<ProxyConfig>,
    pub(crate) client: reqwest::Client,
}

impl AppState {
    /// Creates the state from a loaded configuration.
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config: Arc::new(config),
            client: reqwest::Client::new(),
        }
    }
}

/// Builds the proxy router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(relay::chat))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}
