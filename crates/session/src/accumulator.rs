/// An append-only log of content deltas for one in-flight assistant
/// message.
///
/// The growing message is modeled as this log replayed into immutable
/// snapshots rather than as shared mutable state, so the accumulation
/// stays testable and safe to move across tasks. Deltas are applied
/// strictly in arrival order; a UI may coalesce several snapshots into
/// one repaint, the final content is unaffected.
#[derive(Clone, Debug, Default)]
pub struct DeltaLog {
    deltas: Vec<String>,
}

impl DeltaLog {
    /// Creates an empty log.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one delta to the log.
    #[inline]
    pub fn push<S: Into<String>>(&mut self, delta: S) {
        self.deltas.push(delta.into());
    }

    /// Returns `true` when no delta has arrived yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Replays the log into an immutable snapshot of the text so far.
    pub fn snapshot(&self) -> String {
        self.deltas.concat()
    }
}
