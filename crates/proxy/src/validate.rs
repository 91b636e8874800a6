//! Request payload validation.
//!
//! Validation happens on the raw JSON value so that every violation
//! gets a specific message instead of a generic deserialization error.

use serde_json::Value;

use crate::error::ProxyError;
use crate::relay::UpstreamMessage;

const MAX_MESSAGES: usize = 50;
const MAX_CONTENT_CHARS: usize = 10_000;
const ROLES: [&str; 3] = ["user", "assistant", "system"];

/// Validates the `{messages: [...]}` payload and returns the messages
/// ready for upstream forwarding.
pub(crate) fn validate_messages(
    payload: &Value,
) -> Result<Vec<UpstreamMessage>, ProxyError> {
    let Some(messages) = payload.get("messages").and_then(Value::as_array)
    else {
        return Err(invalid("messages must be an array"));
    };
    if messages.is_empty() || messages.len() > MAX_MESSAGES {
        return Err(invalid(format!(
            "messages must contain between 1 and {MAX_MESSAGES} entries"
        )));
    }

    let mut out = Vec::with_capacity(messages.len());
    for message in messages {
        let Some(role) = message.get("role").and_then(Value::as_str) else {
            return Err(invalid("message role must be a string"));
        };
        if !ROLES.contains(&role) {
            return Err(invalid(
                "message role must be one of user, assistant, system",
            ));
        }
        let Some(content) = message.get("content").and_then(Value::as_str)
        else {
            return Err(invalid("message content must be a string"));
        };
        let chars = content.chars().count();
        if chars == 0 || chars > MAX_CONTENT_CHARS {
            return Err(invalid(format!(
                "message content must be between 1 and {MAX_CONTENT_CHARS} characters"
            )));
        }
        out.push(UpstreamMessage {
            role: role.to_owned(),
            content: content.to_owned(),
        });
    }
    Ok(out)
}

fn invalid(message: impl Into<String>) -> ProxyError {
    ProxyError::InvalidRequest(message.into())
}
