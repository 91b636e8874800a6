use relaychat_model::{ChatMessage, RelayRequest, Role};
use serde::{Deserialize, Serialize};

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ChatCompletionChunk {
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct Choice {
    pub delta: Delta,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct Delta {
    pub content: Option<String>,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ApiMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ApiMessage>,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(req: &RelayRequest) -> ChatRequest {
    ChatRequest {
        messages: req.messages.iter().map(create_message).collect(),
    }
}

// Attachment content is extracted in a separate step; only the names
// travel with the chat request, as inline context markers.
fn create_message(msg: &ChatMessage) -> ApiMessage {
    let content = if msg.attachments.is_empty() {
        msg.content.clone()
    } else {
        let mut content = String::new();
        for file in &msg.attachments {
            content.push_str(&format!("[file: {}]\n", file.name));
        }
        content.push_str(&msg.content);
        content
    };
    ApiMessage {
        role: msg.role,
        content,
    }
}

#[cfg(test)]
mod tests {
    use relaychat_model::FileRef;

    use super::*;

    #[test]
    fn test_create_request() {
        let request = RelayRequest {
            messages: vec![
                ChatMessage::system("You are a helpful assistant."),
                ChatMessage::user("Hello"),
            ],
        };
        let expected = ChatRequest {
            messages: vec![
                ApiMessage {
                    role: Role::System,
                    content: "You are a helpful assistant.".to_owned(),
                },
                ApiMessage {
                    role: Role::User,
                    content: "Hello".to_owned(),
                },
            ],
        };
        assert_eq!(create_request(&request), expected);
    }

    #[test]
    fn test_attachment_markers_are_prepended() {
        let msg = ChatMessage::user("Summarize these")
            .with_attachment(FileRef {
                name: "report.pdf".to_owned(),
                media_type: Some("application/pdf".to_owned()),
            })
            .with_attachment(FileRef {
                name: "notes.txt".to_owned(),
                media_type: None,
            });
        let request = RelayRequest {
            messages: vec![msg],
        };
        let api = create_request(&request);
        assert_eq!(
            api.messages[0].content,
            "[file: report.pdf]\n[file: notes.txt]\nSummarize these"
        );
    }

    #[test]
    fn test_chunk_ignores_unknown_fields() {
        let chunk: ChatCompletionChunk = serde_json::from_str(
            r#"{"id":"c1","model":"m","choices":[{"index":0,"delta":{"content":"hi","role":"assistant"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("hi"));
    }

    #[test]
    fn test_roles_serialize_lowercase() {
        let json = serde_json::to_string(&ApiMessage {
            role: Role::Assistant,
            content: "ok".to_owned(),
        })
        .unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"ok"}"#);
    }
}
