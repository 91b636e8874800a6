use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use relaychat_model::{
    RelayError, RelayProvider, RelayRequest, RelayResponse,
};
use tracing::Instrument;

type SendRequestResult = Result<RelayOutcome, RelayError>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(RelayRequest, Box<dyn Fn(String) + Send + 'static>)
        -> BoxedSendRequestFuture + Send + Sync
>;

/// A wrapper around a relay provider that drives one streaming call to
/// completion and provides a type-erased interface for the session.
#[derive(Clone)]
pub struct RelayClient {
    handler_fn: HandlerFn,
}

impl RelayClient {
    /// Creates a client wrapping the given provider.
    #[inline]
    pub fn new<P: RelayProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `RelayClient` doesn't
        // have a generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req, on_delta| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err, on_delta).await
                }
                .instrument(trace_span!("relay client req")),
            )
        });
        Self { handler_fn }
    }

    /// Sends a request and drives its stream to completion, invoking
    /// `on_delta` for every content delta in arrival order.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// deltas when this operation is cancelled, and `on_delta` is never
    /// invoked afterwards.
    #[inline]
    pub async fn send_request(
        &self,
        req: RelayRequest,
        on_delta: impl Fn(String) + Send + 'static,
    ) -> Result<RelayOutcome, RelayError> {
        (self.handler_fn)(req, Box::new(on_delta)).await
    }
}

/// A completely received response from the relay client.
#[derive(Clone, Debug)]
pub struct RelayOutcome {
    /// The final accumulated assistant text.
    pub text: String,
}

async fn handle_response<P: RelayProvider + 'static>(
    resp_or_err: Result<P::Response, RelayError>,
    on_delta: Box<dyn Fn(String) + Send + 'static>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("relay request failed: {err}");
            return Err(err);
        }
    };

    let mut text = String::new();

    trace!("start receiving deltas");

    let mut pinned_resp = pin!(resp);
    loop {
        let delta_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_delta(cx)).await;
        let delta = match delta_or_err {
            Ok(delta) => delta,
            Err(err) => {
                error!("relay stream failed: {err}");
                return Err(err);
            }
        };

        let Some(delta) = delta else {
            // The stream has terminated gracefully.
            break;
        };
        trace!("got a delta: {delta:?}");

        text.push_str(&delta);
        on_delta(delta);
    }

    trace!("finished a request");

    Ok(RelayOutcome { text })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use relaychat_model::ChatMessage;
    use relaychat_test_relay::{PresetResponse, ScriptedRelay};

    use super::*;

    #[tokio::test]
    async fn test_send_request() {
        let mut relay = ScriptedRelay::default();
        relay.push_response(PresetResponse::with_deltas([
            "How ", "are ", "you?",
        ]));

        let client = RelayClient::new(relay);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let outcome = client
            .send_request(
                RelayRequest {
                    messages: vec![ChatMessage::user("Hi")],
                },
                {
                    let seen = Arc::clone(&seen);
                    move |delta| seen.lock().unwrap().push(delta)
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.text, "How are you?");
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["How ", "are ", "you?"]
        );
    }

    #[tokio::test]
    async fn test_error_handling() {
        let mut relay = ScriptedRelay::default();
        relay.push_rejection(RelayError::RateLimited);
        let client = RelayClient::new(relay);
        let err = client
            .send_request(
                RelayRequest {
                    messages: vec![ChatMessage::user("Hi")],
                },
                |_| {},
            )
            .await
            .unwrap_err();
        assert_eq!(err, RelayError::RateLimited);
    }

    #[tokio::test]
    async fn test_partial_deltas_before_failure() {
        let mut relay = ScriptedRelay::default();
        relay.push_response(
            PresetResponse::with_deltas(["some ", "text"])
                .failing_with(RelayError::Network("dropped".to_owned())),
        );
        let client = RelayClient::new(relay);
        let seen = Arc::new(Mutex::new(String::new()));
        let err = client
            .send_request(
                RelayRequest {
                    messages: vec![ChatMessage::user("Hi")],
                },
                {
                    let seen = Arc::clone(&seen);
                    move |delta| seen.lock().unwrap().push_str(&delta)
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Network(_)));
        // Deltas delivered before the drop remain useful.
        assert_eq!(*seen.lock().unwrap(), "some text");
    }
}
