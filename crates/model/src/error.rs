/// The error reported for a failed relay attempt.
///
/// Exactly one variant is produced per failed attempt, and callers must
/// surface it to the user instead of silently swallowing it. Partial
/// assistant output that was accumulated before the failure is left in
/// place, since partial output is still useful.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// The relay proxy (or its upstream) is rate limiting the caller.
    ///
    /// Non-fatal; retrying is the user's choice.
    #[error("rate limited, please try again later")]
    RateLimited,
    /// The upstream rejected the request for billing reasons.
    #[error("payment required to continue using the service")]
    PaymentRequired,
    /// No fresh credential could be obtained before the request.
    ///
    /// This is always detected before any network call is issued.
    #[error("not authenticated")]
    Unauthenticated,
    /// The proxy or its upstream answered with an unexpected status.
    #[error("upstream failure (status {0})")]
    Upstream(u16),
    /// The transport dropped, or the stream ended without its terminal
    /// marker.
    #[error("network error: {0}")]
    Network(String),
}

impl RelayError {
    /// Returns `true` when the failure is worth offering a retry for.
    ///
    /// Authentication failures are excluded: they require a re-login
    /// first.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, RelayError::Unauthenticated)
    }
}
