use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    /// Pre-warm hasn't completed — all acquires fail fast (§4.1).
    #[error("pool not ready")]
    NotReady,

    /// Acquire timed out waiting for a handle (§4.1).
    #[error("pool exhausted: timed out after {0:?}")]
    Exhausted(std::time::Duration),

    /// Backend connect/probe failure, classified retryable or not.
    #[error("transport error: {0}")]
    Transport(String),

    /// A domain-level failure surfaced from inside `with_connection` (e.g.
    /// duplicate key on create) — not a pool/transport problem.
    #[error("{0}")]
    Domain(String),
}

impl PoolError {
    /// Whether this failure should be retried by `with_connection_and_retry`
    /// (§4.1): connection refused, DNS failure, server-gone-away, transient
    /// timeout. Domain errors (integrity violations, bad SQL, auth) and
    /// exhaustion/not-ready are never retried here.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<PoolError> for runtime_common::RuntimeError {
    fn from(e: PoolError) -> Self {
        match e {
            PoolError::NotReady => runtime_common::RuntimeError::PoolNotReady,
            PoolError::Exhausted(d) => {
                runtime_common::RuntimeError::PoolExhausted(format!("timed out after {d:?}"))
            }
            PoolError::Transport(msg) => runtime_common::RuntimeError::Transport(msg),
            PoolError::Domain(msg) => runtime_common::RuntimeError::IntegrityViolation(msg),
        }
    }
}
