//! Boundaries for the external collaborators the relay core consumes.
//!
//! Authentication, persistence and speech synthesis are provided by
//! managed services; the core only depends on these traits.

use async_trait::async_trait;
use uuid::Uuid;

use crate::conversation::{Conversation, ConversationKind};
use crate::message::SynthesizedAudio;

/// Issues bearer credentials for relay calls.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns a fresh bearer token, or `None` when the user has no
    /// valid session and must log in again.
    async fn bearer_token(&self) -> Option<String>;
}

/// The speech-synthesis collaborator.
///
/// Voice is a non-critical enhancement: callers log synthesis failures
/// and never block or retry the text response because of them.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesizes speech for `text` with the given voice, returning
    /// the encoded audio.
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
    ) -> Result<SynthesizedAudio, SynthesisError>;
}

/// Error from a speech-synthesis attempt.
#[derive(Debug, thiserror::Error)]
#[error("speech synthesis failed: {0}")]
pub struct SynthesisError(pub String);

/// Persists conversation metadata in the managed relational store.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Creates a conversation row.
    async fn create(
        &self,
        title: &str,
        kind: ConversationKind,
    ) -> Result<Conversation, StoreError>;

    /// Bumps the activity timestamp of a conversation.
    async fn touch(&self, id: Uuid) -> Result<(), StoreError>;

    /// Deletes a conversation.
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    /// Lists the caller's conversations, most recently updated first.
    async fn list(&self) -> Result<Vec<Conversation>, StoreError>;
}

/// Error from the conversation store.
#[derive(Debug, thiserror::Error)]
#[error("conversation store error: {0}")]
pub struct StoreError(pub String);
