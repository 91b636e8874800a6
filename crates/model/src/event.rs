/// One classified line of the relay event stream.
///
/// Produced by the event parser and consumed immediately by the
/// accumulator; these values are transient and never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StreamEvent {
    /// An incremental fragment of the assistant's text.
    ContentDelta(String),
    /// The terminal marker; the stream ends successfully after this.
    Done,
    /// A blank or `:`-prefixed keep-alive line, ignored.
    Comment,
    /// A line that could not be interpreted, carrying the raw text.
    ///
    /// Malformed lines are logged and skipped; they are never fatal
    /// and never corrupt subsequent valid deltas.
    Malformed(String),
}
