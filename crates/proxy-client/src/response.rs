use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use relaychat_model::{RelayError, RelayResponse, StreamEvent};

use crate::io::{EventStream, EventStreamError};

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextDelta = Result<(Option<String>, EventStream), RelayError>;

pin_project! {
    /// The streaming half of one relay call.
    ///
    /// Deltas are surfaced strictly in arrival order; once the terminal
    /// marker has been seen, no further deltas are ever produced.
    pub struct ProxyResponse {
        next_delta_fut: Option<PinnedFuture<NextDelta>>,
    }
}

impl std::fmt::Debug for ProxyResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyResponse")
            .finish_non_exhaustive()
    }
}

impl ProxyResponse {
    #[inline]
    pub(crate) fn from_events(events: EventStream) -> Self {
        Self {
            next_delta_fut: Some(Box::pin(next_delta(events))),
        }
    }
}

impl RelayResponse for ProxyResponse {
    fn poll_next_delta(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<String>, RelayError>> {
        let this = self.project();
        let Some(next_delta_fut) = this.next_delta_fut else {
            // The stream has already terminated.
            return Poll::Ready(Ok(None));
        };
        let (delta, events) = match ready!(next_delta_fut.as_mut().poll(cx)) {
            Ok((Some(delta), events)) => (delta, events),
            Ok((None, _)) => {
                *this.next_delta_fut = None;
                return Poll::Ready(Ok(None));
            }
            Err(err) => {
                *this.next_delta_fut = None;
                return Poll::Ready(Err(err));
            }
        };

        // The stream may still have more data to pull, create a new
        // future for the next delta.
        *this.next_delta_fut = Some(Box::pin(next_delta(events)));

        Poll::Ready(Ok(Some(delta)))
    }
}

async fn next_delta(
    mut events: EventStream,
) -> Result<(Option<String>, EventStream), RelayError> {
    loop {
        let event = events.next_event().await.map_err(relay_error)?;
        match event {
            Some(StreamEvent::ContentDelta(delta)) => {
                return Ok((Some(delta), events));
            }
            Some(StreamEvent::Done) | None => {
                return Ok((None, events));
            }
            Some(StreamEvent::Comment) => {
                trace!("skipping comment line");
            }
            Some(StreamEvent::Malformed(raw)) => {
                warn!("skipping malformed line: {raw:?}");
            }
        }
    }
}

fn relay_error(err: EventStreamError) -> RelayError {
    match err {
        EventStreamError::Transport(msg) => RelayError::Network(msg),
        EventStreamError::InvalidUtf8 => {
            RelayError::Network("stream contained invalid UTF-8".to_owned())
        }
        EventStreamError::Incomplete => RelayError::Network(
            "stream closed before the terminal marker".to_owned(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use bytes::Bytes;

    use super::*;
    use crate::io::{Chunks, LineBuffer};

    fn response_of(chunks: Vec<Bytes>) -> ProxyResponse {
        ProxyResponse::from_events(EventStream::new(LineBuffer::new(
            Chunks::from_vec_deque(chunks.into()),
        )))
    }

    async fn drain(resp: &mut Pin<&mut ProxyResponse>) -> Vec<String> {
        let mut deltas = Vec::new();
        while let Some(delta) =
            poll_fn(|cx| resp.as_mut().poll_next_delta(cx)).await.unwrap()
        {
            deltas.push(delta);
        }
        deltas
    }

    #[tokio::test]
    async fn test_deltas_arrive_in_order() {
        let mut resp = pin!(response_of(vec![Bytes::from_static(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\
              data: {\"choices\":[{\"delta\":{\"content\":\"lo, \"}}]}\n\
              data: {\"choices\":[{\"delta\":{\"content\":\"world\"}}]}\n\
              data: [DONE]\n"
        )]));
        let deltas = drain(&mut resp).await;
        assert_eq!(deltas, vec!["Hel", "lo, ", "world"]);
    }

    #[tokio::test]
    async fn test_multibyte_split_across_chunks() {
        // "日本" in one payload split inside the first character.
        let payload =
            "data: {\"choices\":[{\"delta\":{\"content\":\"日本\"}}]}\n";
        let bytes = payload.as_bytes();
        let split = bytes.iter().position(|&b| b == 0xe6).unwrap() + 1;
        let mut resp = pin!(response_of(vec![
            Bytes::copy_from_slice(&bytes[..split]),
            Bytes::copy_from_slice(&bytes[split..]),
            Bytes::from_static(b"data: [DONE]\n"),
        ]));
        let deltas = drain(&mut resp).await;
        assert_eq!(deltas, vec!["日本"]);
    }

    #[tokio::test]
    async fn test_error_keeps_earlier_deltas() {
        let mut resp = pin!(response_of(vec![Bytes::from_static(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n"
        )]));
        let delta = poll_fn(|cx| resp.as_mut().poll_next_delta(cx))
            .await
            .unwrap();
        assert_eq!(delta.as_deref(), Some("partial"));
        let err = poll_fn(|cx| resp.as_mut().poll_next_delta(cx))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Network(_)));
    }

    #[tokio::test]
    async fn test_poll_after_completion_returns_none() {
        let mut resp =
            pin!(response_of(vec![Bytes::from_static(b"data: [DONE]\n")]));
        assert!(drain(&mut resp).await.is_empty());
        let again = poll_fn(|cx| resp.as_mut().poll_next_delta(cx))
            .await
            .unwrap();
        assert_eq!(again, None);
    }
}
