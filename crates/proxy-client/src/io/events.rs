use relaychat_model::StreamEvent;

use super::{LineBuffer, LineBufferError};
use crate::proto::ChatCompletionChunk;

const DATA_PREFIX: &str = "data: ";
const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventStreamError {
    /// The transport dropped mid-stream.
    Transport(String),
    /// The body contained bytes that are not valid UTF-8.
    InvalidUtf8,
    /// The transport closed without the terminal `[DONE]` marker.
    Incomplete,
}

enum Classified {
    Event(StreamEvent),
    // A valid payload that carries no content (e.g. a role-only delta).
    Nothing,
}

/// A type for reading protocol events from a chunked line stream.
///
/// Each decoded line is classified as a content delta, the terminal
/// marker, a comment, or a malformed fragment. A `data: ` payload whose
/// line boundary has not arrived yet is pushed back into the pending
/// buffer and retried once more bytes arrive, so a JSON object split
/// across network chunks is always reassembled rather than dropped.
pub struct EventStream {
    lines: LineBuffer,
    done: bool,
}

impl EventStream {
    #[inline]
    pub fn new(lines: LineBuffer) -> Self {
        Self { lines, done: false }
    }

    /// Pulls the next event off the stream.
    ///
    /// Returns `Ok(None)` once the terminal marker has been seen; no
    /// further lines are read after that.
    pub async fn next_event(
        &mut self,
    ) -> Result<Option<StreamEvent>, EventStreamError> {
        if self.done {
            return Ok(None);
        }

        loop {
            while let Some(line) = self.lines.next_complete_line() {
                match classify_line(&line) {
                    Classified::Event(StreamEvent::Done) => {
                        self.done = true;
                        return Ok(Some(StreamEvent::Done));
                    }
                    Classified::Event(event) => return Ok(Some(event)),
                    Classified::Nothing => {}
                }
            }

            // The remainder has no line boundary yet. A complete payload
            // may still be sitting there (the upstream may close without
            // a trailing newline), so try it eagerly; anything that does
            // not parse is pushed back untouched and retried once more
            // bytes arrive.
            if let Some(tail) = self.lines.take_tail() {
                match classify_tail(&tail) {
                    Some(Classified::Event(StreamEvent::Done)) => {
                        self.done = true;
                        return Ok(Some(StreamEvent::Done));
                    }
                    Some(Classified::Event(event)) => return Ok(Some(event)),
                    Some(Classified::Nothing) => {}
                    None => self.lines.push_back(tail),
                }
            }

            match self.lines.fill().await {
                Ok(true) => {}
                Ok(false) => {
                    // The transport closed without the terminal marker;
                    // whatever is still buffered is discarded.
                    if let Some(tail) = self.lines.take_tail() {
                        warn!("discarding unterminated fragment: {tail:?}");
                    }
                    return Err(EventStreamError::Incomplete);
                }
                Err(LineBufferError::Transport(err)) => {
                    return Err(EventStreamError::Transport(err.0));
                }
                Err(LineBufferError::InvalidUtf8) => {
                    return Err(EventStreamError::InvalidUtf8);
                }
            }
        }
    }
}

fn classify_line(line: &str) -> Classified {
    if line.is_empty() || line.starts_with(':') {
        return Classified::Event(StreamEvent::Comment);
    }
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Classified::Event(StreamEvent::Malformed(line.to_owned()));
    };
    if payload == DONE_MARKER {
        return Classified::Event(StreamEvent::Done);
    }
    match serde_json::from_str::<ChatCompletionChunk>(payload) {
        Ok(chunk) => delta_from_chunk(chunk),
        // The line is fully terminated, so more bytes cannot fix it.
        Err(_) => Classified::Event(StreamEvent::Malformed(line.to_owned())),
    }
}

/// Classifies the unterminated remainder of the buffer.
///
/// Returns `None` when the fragment may still be completed by more
/// bytes, which is the caller's cue to push it back.
fn classify_tail(tail: &str) -> Option<Classified> {
    let payload = tail.strip_prefix(DATA_PREFIX)?;
    if payload == DONE_MARKER {
        return Some(Classified::Event(StreamEvent::Done));
    }
    let chunk = serde_json::from_str::<ChatCompletionChunk>(payload).ok()?;
    Some(delta_from_chunk(chunk))
}

fn delta_from_chunk(mut chunk: ChatCompletionChunk) -> Classified {
    let Some(choice) = chunk.choices.drain(..).next() else {
        return Classified::Nothing;
    };
    match choice.delta.content {
        Some(content) if !content.is_empty() => {
            Classified::Event(StreamEvent::ContentDelta(content))
        }
        _ => Classified::Nothing,
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::io::Chunks;

    fn stream_of(chunks: Vec<Bytes>) -> EventStream {
        EventStream::new(LineBuffer::new(Chunks::from_vec_deque(
            chunks.into(),
        )))
    }

    fn delta_line(text: &str) -> String {
        format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":{}}}}}]}}\n",
            serde_json::to_string(text).unwrap()
        )
    }

    async fn collect_text(mut stream: EventStream) -> String {
        let mut text = String::new();
        loop {
            match stream.next_event().await.unwrap() {
                Some(StreamEvent::ContentDelta(delta)) => {
                    text.push_str(&delta);
                }
                Some(StreamEvent::Done) | None => return text,
                Some(_) => {}
            }
        }
    }

    #[tokio::test]
    async fn test_delta_sequence() {
        let body = format!(
            "{}{}{}data: [DONE]\n",
            delta_line("Hel"),
            delta_line("lo, "),
            delta_line("world")
        );
        let stream = stream_of(vec![Bytes::from(body)]);
        assert_eq!(collect_text(stream).await, "Hello, world");
    }

    #[tokio::test]
    async fn test_payload_split_mid_object() {
        let stream = stream_of(vec![
            Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"con"),
            Bytes::from_static(b"tent\":\"X\"}}]}\ndata: [DONE]\n"),
        ]);
        assert_eq!(collect_text(stream).await, "X");
    }

    #[tokio::test]
    async fn test_malformed_line_is_skipped() {
        let body = format!(
            "data: not-json\n{}data: [DONE]\n",
            delta_line("ok")
        );
        let mut stream = stream_of(vec![Bytes::from(body)]);
        assert_eq!(
            stream.next_event().await.unwrap(),
            Some(StreamEvent::Malformed("data: not-json".to_owned()))
        );
        assert_eq!(
            stream.next_event().await.unwrap(),
            Some(StreamEvent::ContentDelta("ok".to_owned()))
        );
        assert_eq!(stream.next_event().await.unwrap(), Some(StreamEvent::Done));
    }

    #[tokio::test]
    async fn test_comments_and_blank_lines() {
        let stream = stream_of(vec![Bytes::from(format!(
            ": keep-alive\n\n{}data: [DONE]\n",
            delta_line("hi")
        ))]);
        assert_eq!(collect_text(stream).await, "hi");
    }

    #[tokio::test]
    async fn test_nothing_after_done() {
        let mut stream = stream_of(vec![Bytes::from(format!(
            "{}data: [DONE]\n{}",
            delta_line("before"),
            delta_line("after")
        ))]);
        assert_eq!(
            stream.next_event().await.unwrap(),
            Some(StreamEvent::ContentDelta("before".to_owned()))
        );
        assert_eq!(stream.next_event().await.unwrap(), Some(StreamEvent::Done));
        assert_eq!(stream.next_event().await.unwrap(), None);
        assert_eq!(stream.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_done_without_trailing_newline() {
        let mut stream = stream_of(vec![Bytes::from(format!(
            "{}data: [DONE]",
            delta_line("x")
        ))]);
        assert_eq!(
            stream.next_event().await.unwrap(),
            Some(StreamEvent::ContentDelta("x".to_owned()))
        );
        assert_eq!(stream.next_event().await.unwrap(), Some(StreamEvent::Done));
    }

    #[tokio::test]
    async fn test_close_without_done_is_incomplete() {
        let mut stream = stream_of(vec![Bytes::from(delta_line("partial"))]);
        assert_eq!(
            stream.next_event().await.unwrap(),
            Some(StreamEvent::ContentDelta("partial".to_owned()))
        );
        assert_eq!(
            stream.next_event().await.unwrap_err(),
            EventStreamError::Incomplete
        );
    }

    #[tokio::test]
    async fn test_role_only_delta_emits_nothing() {
        let stream = stream_of(vec![Bytes::from(format!(
            "data: {{\"choices\":[{{\"delta\":{{\"role\":\"assistant\"}}}}]}}\n{}data: [DONE]\n",
            delta_line("text")
        ))]);
        assert_eq!(collect_text(stream).await, "text");
    }

    #[tokio::test]
    async fn test_identical_bytes_decode_identically() {
        let chunks: Vec<Bytes> = vec![
            Bytes::from(delta_line("a")),
            Bytes::from_static(b"data: {\"choices\":[{\"de"),
            Bytes::from_static(b"lta\":{\"content\":\"b\"}}]}\n"),
            Bytes::from_static(b"data: [DONE]\n"),
        ];
        let first = collect_text(stream_of(chunks.clone())).await;
        let second = collect_text(stream_of(chunks)).await;
        assert_eq!(first, "ab");
        assert_eq!(first, second);
    }
}
