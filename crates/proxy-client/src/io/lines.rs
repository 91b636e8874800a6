use std::str;

use super::{Chunks, ChunksError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineBufferError {
    Transport(ChunksError),
    InvalidUtf8,
}

/// A type for turning raw byte chunks into complete text lines.
///
/// Bytes are decoded incrementally: a chunk may end in the middle of a
/// multi-byte character, in which case the incomplete tail is carried
/// over and completed by the next chunk. One buffer serves exactly one
/// request; restarting means creating a new one.
pub struct LineBuffer {
    chunks: Chunks,
    // Undecoded bytes, at most one incomplete character.
    carry: Vec<u8>,
    buf: String,
}

impl LineBuffer {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            chunks,
            carry: Vec::new(),
            buf: String::new(),
        }
    }

    /// Reads one more chunk from the transport into the buffer.
    ///
    /// Returns `false` when the transport has closed and no further
    /// data will ever arrive.
    pub async fn fill(&mut self) -> Result<bool, LineBufferError> {
        let Some(bytes) = self
            .chunks
            .next_chunk()
            .await
            .map_err(LineBufferError::Transport)?
        else {
            return Ok(false);
        };
        self.decode(&bytes)?;
        Ok(true)
    }

    /// Takes the next complete (`\n`-terminated) line off the buffer,
    /// without its terminator.
    pub fn next_complete_line(&mut self) -> Option<String> {
        let eol_idx = self.buf.find('\n')?;
        let mut line: String = self.buf.drain(0..=eol_idx).collect();
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }

    /// Takes the unterminated remainder of the buffer, if any.
    ///
    /// Callers that fail to interpret it must give it back with
    /// [`Self::push_back`] so it can be retried once more bytes arrive.
    pub fn take_tail(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.buf))
    }

    /// Prepends previously taken text back onto the buffer.
    pub fn push_back(&mut self, text: String) {
        if self.buf.is_empty() {
            self.buf = text;
        } else {
            self.buf.insert_str(0, &text);
        }
    }

    fn decode(&mut self, bytes: &[u8]) -> Result<(), LineBufferError> {
        self.carry.extend_from_slice(bytes);
        match str::from_utf8(&self.carry) {
            Ok(s) => {
                self.buf.push_str(s);
                self.carry.clear();
                Ok(())
            }
            Err(err) if err.error_len().is_none() => {
                // The buffer ends in an incomplete character; decode the
                // valid head and keep the tail for the next chunk.
                let valid = err.valid_up_to();
                let head = str::from_utf8(&self.carry[..valid])
                    .map_err(|_| LineBufferError::InvalidUtf8)?;
                self.buf.push_str(head);
                self.carry.drain(0..valid);
                Ok(())
            }
            Err(_) => Err(LineBufferError::InvalidUtf8),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    async fn collect_lines(chunks: Vec<Bytes>) -> Vec<String> {
        let mut lines = LineBuffer::new(Chunks::from_vec_deque(chunks.into()));
        let mut out = Vec::new();
        loop {
            while let Some(line) = lines.next_complete_line() {
                out.push(line);
            }
            if !lines.fill().await.unwrap() {
                break;
            }
        }
        if let Some(tail) = lines.take_tail() {
            out.push(tail);
        }
        out
    }

    #[tokio::test]
    async fn test_lines_across_chunks() {
        let lines = collect_lines(vec![
            Bytes::from_static(b"one\ntw"),
            Bytes::from_static(b"o\nthree\n"),
        ])
        .await;
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_utf8_split_across_chunks() {
        // "héllo\n" with the two-byte 'é' split between chunks.
        let bytes = "héllo\n".as_bytes();
        let lines = collect_lines(vec![
            Bytes::copy_from_slice(&bytes[..2]),
            Bytes::copy_from_slice(&bytes[2..]),
        ])
        .await;
        assert_eq!(lines, vec!["héllo"]);
    }

    #[tokio::test]
    async fn test_crlf_line_endings() {
        let lines =
            collect_lines(vec![Bytes::from_static(b"data: x\r\n")]).await;
        assert_eq!(lines, vec!["data: x"]);
    }

    #[tokio::test]
    async fn test_invalid_bytes() {
        let mut lines = LineBuffer::new(Chunks::from_vec_deque(
            vec![Bytes::from_static(b"\xff\xfe")].into(),
        ));
        assert_eq!(
            lines.fill().await.unwrap_err(),
            LineBufferError::InvalidUtf8
        );
    }

    #[tokio::test]
    async fn test_push_back_restores_order() {
        let mut lines = LineBuffer::new(Chunks::from_vec_deque(
            vec![Bytes::from_static(b"partial")].into(),
        ));
        assert!(lines.fill().await.unwrap());
        let tail = lines.take_tail().unwrap();
        assert_eq!(tail, "partial");
        lines.push_back(tail);
        assert!(!lines.fill().await.unwrap());
        assert_eq!(lines.take_tail().unwrap(), "partial");
    }
}
