//! A local fake relay for testing purpose.

use std::collections::VecDeque;
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use relaychat_model::{
    RelayError, RelayProvider, RelayRequest, RelayResponse,
};
use tokio::time::{Sleep, sleep};

/// The scripted reply for one relay call.
#[derive(Clone, Debug, Default)]
pub struct PresetResponse {
    /// Content deltas delivered in order.
    pub deltas: Vec<String>,
    /// When set, the stream fails with this error after the deltas
    /// instead of terminating gracefully.
    pub error: Option<RelayError>,
}

impl PresetResponse {
    /// Creates a preset delivering the given deltas and terminating
    /// gracefully.
    #[inline]
    pub fn with_deltas<I, S>(deltas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            deltas: deltas.into_iter().map(Into::into).collect(),
            error: None,
        }
    }

    /// Makes the stream fail with `error` after its deltas.
    #[inline]
    pub fn failing_with(mut self, error: RelayError) -> Self {
        self.error = Some(error);
        self
    }
}

enum ScriptStep {
    Respond(PresetResponse),
    // The request itself is rejected (e.g. the status check fails).
    Reject(RelayError),
}

/// A local fake relay for testing purpose.
///
/// Before sending requests, push the responses the relay should stream
/// back, in order. Each `send_request` consumes one scripted step; a
/// request past the end of the script fails with a network error.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy
/// memory copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct ScriptedRelay {
    script: Arc<Mutex<VecDeque<ScriptStep>>>,
    delay: Option<Duration>,
}

impl ScriptedRelay {
    /// Pushes a streamed response onto the script.
    #[inline]
    pub fn push_response(&mut self, preset: PresetResponse) {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptStep::Respond(preset));
    }

    /// Pushes a request rejection onto the script.
    #[inline]
    pub fn push_rejection(&mut self, error: RelayError) {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptStep::Reject(error));
    }

    /// Sets a delay before each delivered delta.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }
}

impl RelayProvider for ScriptedRelay {
    type Response = ScriptedResponse;

    fn send_request(
        &self,
        _req: &RelayRequest,
    ) -> impl Future<Output = Result<Self::Response, RelayError>> + Send + 'static
    {
        let step = self.script.lock().unwrap().pop_front();
        let delay = self.delay.unwrap_or(Duration::from_millis(1));
        let result = match step {
            Some(ScriptStep::Respond(preset)) => Ok(ScriptedResponse {
                deltas: preset.deltas.into(),
                error: preset.error,
                delay,
                sleep: None,
                finished: false,
            }),
            Some(ScriptStep::Reject(error)) => Err(error),
            None => Err(RelayError::Network(
                "scripted relay has no more steps".to_owned(),
            )),
        };
        ready(result)
    }
}

/// The streaming half of a [`ScriptedRelay`] call.
#[derive(Debug)]
pub struct ScriptedResponse {
    deltas: VecDeque<String>,
    error: Option<RelayError>,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
    finished: bool,
}

impl RelayResponse for ScriptedResponse {
    fn poll_next_delta(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<String>, RelayError>> {
        let this = self.get_mut();
        if this.finished {
            // In case this method is called after completion.
            return Poll::Ready(Ok(None));
        }

        if let Some(sleep) = &mut this.sleep {
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;

            if let Some(delta) = this.deltas.pop_front() {
                return Poll::Ready(Ok(Some(delta)));
            }
            this.finished = true;
            if let Some(error) = this.error.take() {
                return Poll::Ready(Err(error));
            }
            return Poll::Ready(Ok(None));
        }
        this.sleep = Some(Box::pin(sleep(this.delay)));
        Pin::new(this).poll_next_delta(cx)
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use relaychat_model::ChatMessage;

    use super::*;

    async fn collect(resp: ScriptedResponse) -> Result<String, RelayError> {
        let mut resp = pin!(resp);
        let mut text = String::new();
        loop {
            match poll_fn(|cx| resp.as_mut().poll_next_delta(cx)).await? {
                Some(delta) => text.push_str(&delta),
                None => return Ok(text),
            }
        }
    }

    #[tokio::test]
    async fn test_scripted_deltas() {
        let mut relay = ScriptedRelay::default();
        relay.push_response(PresetResponse::with_deltas([
            "Hello, ", "world!",
        ]));

        let req = RelayRequest {
            messages: vec![ChatMessage::user("Hi")],
        };
        let resp = relay.send_request(&req).await.unwrap();
        assert_eq!(collect(resp).await.unwrap(), "Hello, world!");

        // The script has been consumed.
        let err = relay.send_request(&req).await.unwrap_err();
        assert!(matches!(err, RelayError::Network(_)));
    }

    #[tokio::test]
    async fn test_scripted_rejection() {
        let mut relay = ScriptedRelay::default();
        relay.push_rejection(RelayError::PaymentRequired);
        let req = RelayRequest {
            messages: vec![ChatMessage::user("Hi")],
        };
        let err = relay.send_request(&req).await.unwrap_err();
        assert_eq!(err, RelayError::PaymentRequired);
    }

    #[tokio::test]
    async fn test_scripted_stream_failure() {
        let mut relay = ScriptedRelay::default();
        relay.push_response(
            PresetResponse::with_deltas(["partial"])
                .failing_with(RelayError::Network("dropped".to_owned())),
        );
        let req = RelayRequest {
            messages: vec![ChatMessage::user("Hi")],
        };
        let resp = relay.send_request(&req).await.unwrap();
        let err = collect(resp).await.unwrap_err();
        assert_eq!(err, RelayError::Network("dropped".to_owned()));
    }
}
