use std::pin::Pin;
use std::task::{self, Poll};

use crate::error::RelayError;
use crate::message::ChatMessage;

/// A request to be relayed for one chat turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayRequest {
    /// The full prior history plus the new message, in order.
    pub messages: Vec<ChatMessage>,
}

/// A streaming response from a relay provider.
pub trait RelayResponse: Sized + Send + 'static {
    /// Attempts to pull out the next content delta from the response.
    ///
    /// # Return value
    ///
    /// There are several possible return values, each indicating a
    /// distinct response state:
    ///
    /// - `Poll::Pending` means that this response is still waiting for
    ///   the next delta. Implementations will ensure that the current
    ///   task will be notified when the next delta may be ready.
    /// - `Poll::Ready(Ok(Some(delta)))` means the response has a delta
    ///   to deliver, and may produce further deltas on subsequent
    ///   `poll_next_delta` calls.
    /// - `Poll::Ready(Ok(None))` means the stream reached its terminal
    ///   marker and no further deltas will ever be applied.
    /// - `Poll::Ready(Err(error))` means the relay failed. Deltas that
    ///   were already delivered remain valid partial output.
    ///
    /// Calling this method after completion should always return `None`.
    fn poll_next_delta(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<String>, RelayError>>;
}

/// A type that can open one relay (request/stream cycle) per chat turn.
///
/// Once the provider is created, it should behave like a stateless
/// object. It can still have internal state, but callers should not rely
/// on it, and the provider should be prepared for being dropped anytime.
pub trait RelayProvider: Send + Sync {
    /// The response type for this provider.
    type Response: RelayResponse;

    /// Opens the relay for the given request.
    ///
    /// Implementations must check the response status before reading any
    /// body bytes, so that rate-limit and payment failures are reported
    /// without decoding a stream.
    fn send_request(
        &self,
        req: &RelayRequest,
    ) -> impl Future<Output = Result<Self::Response, RelayError>> + Send + 'static;
}
