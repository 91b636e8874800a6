//! The `/api/chat` relay handler.

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use serde::Serialize;
use serde_json::Value;

use crate::AppState;
use crate::error::ProxyError;
use crate::validate::validate_messages;

/// The fixed instruction prepended to every forwarded conversation.
const SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Answer \
    concisely and accurately. When the user references attached files by \
    name, use the provided context to answer about them.";

#[derive(Debug, Serialize)]
pub(crate) struct UpstreamMessage {
    pub(crate) role: String,
    pub(crate) content: String,
}

#[derive(Debug, Serialize)]
struct UpstreamRequest {
    model: String,
    messages: Vec<UpstreamMessage>,
    stream: bool,
}

/// Relays one chat turn to the upstream completion provider and pipes
/// the event stream back unmodified.
pub(crate) async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    authenticate(&state, &headers)?;

    let payload: Value = serde_json::from_slice(&body).map_err(|_| {
        ProxyError::InvalidRequest(
            "request body must be valid JSON".to_owned(),
        )
    })?;
    let mut messages = validate_messages(&payload)?;
    messages.insert(
        0,
        UpstreamMessage {
            role: "system".to_owned(),
            content: SYSTEM_PROMPT.to_owned(),
        },
    );

    let upstream_req = UpstreamRequest {
        model: state.config.model.clone(),
        messages,
        stream: true,
    };
    let upstream = state
        .client
        .post(format!(
            "{}/chat/completions",
            state.config.upstream_base_url
        ))
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", state.config.upstream_api_key),
        )
        .header(header::ACCEPT, "text/event-stream")
        .json(&upstream_req)
        .send()
        .await?;

    let status = upstream.status();
    match status.as_u16() {
        429 => return Err(ProxyError::RateLimited),
        402 => return Err(ProxyError::PaymentRequired),
        code if !status.is_success() => {
            return Err(ProxyError::Upstream(code));
        }
        _ => {}
    }

    trace!("piping upstream stream back to the caller");

    // Pass-through: no buffering or transformation, so the caller sees
    // the upstream's exact chunk-arrival semantics.
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|_| ProxyError::Upstream(500))?;
    Ok(response)
}

fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<(), ProxyError> {
    let key = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(ProxyError::Unauthenticated("missing bearer credential"))?;
    if !state.config.allowed_keys.contains(key) {
        return Err(ProxyError::Unauthenticated("invalid bearer credential"));
    }
    Ok(())
}
