use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use relaychat_model::{
    ChatMessage, Conversation, ConversationKind, ConversationStore,
    RelayError, RelayProvider, RelayRequest, SpeechSynthesizer, StoreError,
};
use tokio_util::sync::CancellationToken;

use crate::accumulator::DeltaLog;
use crate::client::RelayClient;
use crate::voice::{self, VoiceSettings};

const TITLE_MAX_CHARS: usize = 40;

/// Errors surfaced by [`ChatSession::send`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A relay is already in flight for this conversation.
    #[error("a message is already being relayed for this conversation")]
    Busy,
    /// The message carries neither text nor attachments.
    #[error("the message has no content or attachments")]
    EmptyMessage,
    /// The relay was cancelled by a conversation switch or reset.
    #[error("the relay was cancelled")]
    Cancelled,
    /// The relay itself failed; see [`RelayError`].
    #[error(transparent)]
    Relay(#[from] RelayError),
}

pub(crate) type UpdateFn = Arc<dyn Fn(&[ChatMessage]) + Send + Sync>;

pub(crate) struct Shared {
    pub(crate) messages: Vec<ChatMessage>,
    pub(crate) conversation: Option<Conversation>,
    pub(crate) cancel: CancellationToken,
}

/// [`ChatSession`] builder.
pub struct ChatSessionBuilder {
    client: RelayClient,
    store: Option<Arc<dyn ConversationStore>>,
    voice: Option<VoiceSettings>,
    on_update: Option<UpdateFn>,
}

impl ChatSessionBuilder {
    /// Creates a new builder with the specified relay provider.
    #[inline]
    pub fn with_provider<P: RelayProvider + 'static>(provider: P) -> Self {
        Self {
            client: RelayClient::new(provider),
            store: None,
            voice: None,
            on_update: None,
        }
    }

    /// Attaches a conversation store for metadata persistence.
    #[inline]
    pub fn with_store(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Enables voice mode: finished assistant messages are synthesized
    /// with the given voice and the audio attached to the message.
    #[inline]
    pub fn with_voice<S: Into<String>>(
        mut self,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        voice: S,
    ) -> Self {
        self.voice = Some(VoiceSettings {
            synthesizer,
            voice: voice.into(),
        });
        self
    }

    /// Attaches a callback invoked with a fresh snapshot of the message
    /// list whenever it changes.
    #[inline]
    pub fn on_update(
        mut self,
        on_update: impl Fn(&[ChatMessage]) + Send + Sync + 'static,
    ) -> Self {
        self.on_update = Some(Arc::new(on_update));
        self
    }

    /// Builds the session.
    #[inline]
    pub fn build(self) -> ChatSession {
        ChatSession {
            client: self.client,
            store: self.store,
            voice: self.voice,
            on_update: self.on_update,
            busy: AtomicBool::new(false),
            shared: Arc::new(Mutex::new(Shared {
                messages: vec![],
                conversation: None,
                cancel: CancellationToken::new(),
            })),
        }
    }
}

/// One conversation's view of the chat relay.
///
/// The session owns the in-memory message list and enforces the one
/// invariant that matters here: at most one assistant message is being
/// accumulated at any time, guarded by a busy flag. Every relay call is
/// tied to a cancellation token scoped to the conversation, so a reset
/// or switch can never leak stale deltas into the new conversation's
/// state.
pub struct ChatSession {
    client: RelayClient,
    store: Option<Arc<dyn ConversationStore>>,
    voice: Option<VoiceSettings>,
    on_update: Option<UpdateFn>,
    busy: AtomicBool,
    shared: Arc<Mutex<Shared>>,
}

impl ChatSession {
    /// Returns a snapshot of the current message list.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.shared.lock().unwrap().messages.clone()
    }

    /// Returns the persisted conversation metadata, if any.
    pub fn conversation(&self) -> Option<Conversation> {
        self.shared.lock().unwrap().conversation.clone()
    }

    /// Returns `true` while a relay is in flight.
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Sends a user message and accumulates the streamed reply.
    ///
    /// The full prior history plus the new message is relayed in one
    /// streaming call; content deltas grow the assistant message as
    /// immutable snapshot replacements. On success the voice dispatcher
    /// is invoked exactly once (when enabled). On failure the partial
    /// assistant output already accumulated is left in place.
    pub async fn send(
        &self,
        message: ChatMessage,
    ) -> Result<(), SessionError> {
        if message.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SessionError::Busy);
        }
        let _guard = BusyGuard(&self.busy);
        self.send_inner(message).await
    }

    /// Cancels any in-flight relay and clears the in-memory state,
    /// ready for another conversation.
    pub fn reset(&self) {
        let mut shared = self.shared.lock().unwrap();
        shared.cancel.cancel();
        shared.cancel = CancellationToken::new();
        shared.messages.clear();
        shared.conversation = None;
    }

    /// Deletes the persisted conversation and clears the local state.
    pub async fn delete_conversation(&self) -> Result<(), StoreError> {
        let conversation = self.conversation();
        if let (Some(store), Some(conversation)) =
            (&self.store, conversation)
        {
            store.delete(conversation.id).await?;
        }
        self.reset();
        Ok(())
    }

    async fn send_inner(
        &self,
        message: ChatMessage,
    ) -> Result<(), SessionError> {
        self.ensure_conversation(&message).await;

        let (history, cancel) = {
            let mut shared = self.shared.lock().unwrap();
            shared.messages.push(message);
            self.notify(&shared.messages);
            (shared.messages.clone(), shared.cancel.clone())
        };
        let req = RelayRequest { messages: history };

        let log = Mutex::new(DeltaLog::new());
        let on_delta = {
            let shared = Arc::clone(&self.shared);
            let cancel = cancel.clone();
            let on_update = self.on_update.clone();
            move |delta: String| {
                apply_delta(&shared, &cancel, &log, delta, on_update.as_ref());
            }
        };

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(SessionError::Cancelled),
            outcome = self.client.send_request(req, on_delta) => outcome?,
        };

        {
            let mut shared = self.shared.lock().unwrap();
            if cancel.is_cancelled() {
                return Err(SessionError::Cancelled);
            }
            if let Some(conversation) = &mut shared.conversation {
                conversation.touch();
            }
        }
        self.touch_store().await;

        if let Some(voice) = &self.voice {
            if !outcome.text.is_empty() {
                voice::dispatch(
                    voice,
                    outcome.text,
                    Arc::clone(&self.shared),
                    cancel,
                    self.on_update.clone(),
                );
            }
        }

        Ok(())
    }

    /// Creates the persisted conversation on the first user action.
    async fn ensure_conversation(&self, message: &ChatMessage) {
        let Some(store) = &self.store else {
            return;
        };
        if self.shared.lock().unwrap().conversation.is_some() {
            return;
        }
        let title = conversation_title(message);
        match store.create(&title, ConversationKind::Chat).await {
            Ok(conversation) => {
                self.shared.lock().unwrap().conversation =
                    Some(conversation);
            }
            // Persistence is best effort; chatting continues in memory.
            Err(err) => warn!("failed to create conversation: {err}"),
        }
    }

    async fn touch_store(&self) {
        let conversation = self.conversation();
        if let (Some(store), Some(conversation)) =
            (&self.store, conversation)
        {
            if let Err(err) = store.touch(conversation.id).await {
                warn!("failed to touch conversation: {err}");
            }
        }
    }

    fn notify(&self, messages: &[ChatMessage]) {
        if let Some(on_update) = &self.on_update {
            on_update(messages);
        }
    }
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Applies one arriving content delta to the session state.
///
/// The cancellation check happens under the state lock. `reset` cancels
/// the token while holding that same lock, so a delta racing a reset
/// either lands before the list is cleared or sees the cancelled token;
/// it can never slip into the freshly cleared list.
fn apply_delta(
    shared: &Mutex<Shared>,
    cancel: &CancellationToken,
    log: &Mutex<DeltaLog>,
    delta: String,
    on_update: Option<&UpdateFn>,
) {
    let mut shared = shared.lock().unwrap();
    if cancel.is_cancelled() {
        return;
    }
    let mut log = log.lock().unwrap();
    let first = log.is_empty();
    log.push(delta);
    let snapshot = log.snapshot();
    apply_snapshot(&mut shared.messages, snapshot, first);
    if let Some(on_update) = on_update {
        on_update(&shared.messages);
    }
}

/// Folds a fresh accumulator snapshot into the message list.
///
/// The first delta appends a new assistant message; every later delta
/// replaces the last entry with an updated immutable snapshot, which
/// keeps change detection trivial for reactive consumers.
fn apply_snapshot(
    messages: &mut Vec<ChatMessage>,
    snapshot: String,
    first: bool,
) {
    if first {
        messages.push(ChatMessage::assistant(snapshot));
    } else if let Some(last) = messages.last_mut() {
        *last = ChatMessage::assistant(snapshot);
    }
}

fn conversation_title(message: &ChatMessage) -> String {
    let trimmed = message.content.trim();
    if trimmed.is_empty() {
        return "New chat".to_owned();
    }
    trimmed.chars().take(TITLE_MAX_CHARS).collect()
}
