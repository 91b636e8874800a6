use serde::{Deserialize, Serialize};

/// The author of a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A message typed (or dictated) by the user.
    User,
    /// A message generated by the assistant.
    Assistant,
    /// An instruction injected by the application.
    System,
}

/// A reference to a file the user attached to a message.
///
/// Only the metadata travels with the chat request; content extraction
/// happens in a separate step before the relay is invoked.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRef {
    /// The display name of the file.
    pub name: String,
    /// The MIME type, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// Speech synthesized for a finished assistant message.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SynthesizedAudio {
    /// The encoded audio, base64 as returned by the synthesis endpoint.
    pub base64: String,
    /// The voice the audio was synthesized with.
    pub voice: String,
}

/// A single message in a conversation.
///
/// Messages are immutable once fully accumulated. While a relay is in
/// flight, the growing assistant message is represented by replacing the
/// last list entry with a fresh snapshot, never by mutating it in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who authored the message.
    pub role: Role,
    /// The message text.
    pub content: String,
    /// Files attached to the message, in the order the user picked them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<FileRef>,
    /// Audio synthesized for the message, if voice mode was enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<SynthesizedAudio>,
}

impl ChatMessage {
    /// Creates a plain user message.
    #[inline]
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates a plain assistant message.
    #[inline]
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Creates a plain system message.
    #[inline]
    pub fn system<S: Into<String>>(content: S) -> Self {
        Self::new(Role::System, content)
    }

    #[inline]
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            attachments: vec![],
            audio: None,
        }
    }

    /// Attaches a file reference to the message.
    #[inline]
    pub fn with_attachment(mut self, file: FileRef) -> Self {
        self.attachments.push(file);
        self
    }

    /// Returns `true` when the message carries neither text nor
    /// attachments and therefore must not be sent.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty() && self.attachments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_empty() {
        assert!(ChatMessage::user("   ").is_empty());
        assert!(!ChatMessage::user("hi").is_empty());
        // An attachment alone makes the message sendable.
        assert!(
            !ChatMessage::user("").with_attachment(FileRef {
                name: "report.pdf".to_owned(),
                media_type: None,
            })
            .is_empty()
        );
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let json = serde_json::to_string(&ChatMessage::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }
}
