use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of content a conversation produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    /// A regular chat exchange.
    Chat,
    /// A slide deck generation session.
    ///
    /// Stored rows use the historical wire name `ppt`.
    #[serde(rename = "ppt")]
    Slides,
    /// A video generation session.
    Video,
    /// An image generation session.
    Image,
}

/// Metadata for a persisted conversation.
///
/// The relay core treats this as an opaque identifier: changing the
/// active conversation resets the in-memory message list, nothing else.
/// Persistence lives behind [`crate::ConversationStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// The unique identifier.
    pub id: Uuid,
    /// The user-visible title.
    pub title: String,
    /// What the conversation produces.
    pub kind: ConversationKind,
    /// When the conversation was created.
    pub created_at: DateTime<Utc>,
    /// When the conversation last saw activity.
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Creates a new conversation with freshly stamped timestamps.
    pub fn new<S: Into<String>>(title: S, kind: ConversationKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            kind,
            created_at: now,
            updated_at: now,
        }
    }

    /// Bumps the activity timestamp.
    #[inline]
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        let names: Vec<String> = [
            ConversationKind::Chat,
            ConversationKind::Slides,
            ConversationKind::Video,
            ConversationKind::Image,
        ]
        .iter()
        .map(|kind| serde_json::to_string(kind).unwrap())
        .collect();
        assert_eq!(names, [r#""chat""#, r#""ppt""#, r#""video""#, r#""image""#]);
    }
}
