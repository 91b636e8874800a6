//! The post-stream side-effect dispatcher.
//!
//! Speech synthesis runs as a detached task whose failure is isolated
//! from the primary completion path: the text response is already
//! final, and voice is an enhancement on top of it.

use std::sync::{Arc, Mutex};

use relaychat_model::{Role, SpeechSynthesizer};
use tokio_util::sync::CancellationToken;

use crate::session::{Shared, UpdateFn};

pub(crate) struct VoiceSettings {
    pub(crate) synthesizer: Arc<dyn SpeechSynthesizer>,
    pub(crate) voice: String,
}

/// Synthesizes speech for the finished text and attaches it to the
/// completed assistant message. Fire-and-forget: errors are logged and
/// the text message is never blocked or retried because of them.
pub(crate) fn dispatch(
    settings: &VoiceSettings,
    text: String,
    shared: Arc<Mutex<Shared>>,
    cancel: CancellationToken,
    on_update: Option<UpdateFn>,
) {
    let synthesizer = Arc::clone(&settings.synthesizer);
    let voice = settings.voice.clone();
    tokio::spawn(async move {
        let audio = match synthesizer.synthesize(&text, &voice).await {
            Ok(audio) => audio,
            Err(err) => {
                warn!("voice synthesis failed (ignored): {err}");
                return;
            }
        };

        // Checked under the lock, same as delta application: a reset
        // cancels while holding it.
        let mut shared = shared.lock().unwrap();
        if cancel.is_cancelled() {
            return;
        }
        let Some(last) = shared.messages.last_mut() else {
            return;
        };
        // Attach only if the completed message is still the one the
        // audio was synthesized for.
        if last.role != Role::Assistant || last.content != text {
            return;
        }
        let mut with_audio = last.clone();
        with_audio.audio = Some(audio);
        *last = with_audio;
        if let Some(on_update) = &on_update {
            on_update(&shared.messages);
        }
    });
}
