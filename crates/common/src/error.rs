use http::StatusCode;
use thiserror::Error;

/// Top-level error type for runtime operations.
///
/// Every handler's outermost `catch` converts one of these into the JSON
/// error body from spec.md §7 (`{error, error_full, code, ...}`); `status_code`
/// is the only place that error kind is translated into an HTTP status.
#[derive(Debug, Error)]
pub enum RuntimeError {
    // --- Transport errors (pool/backend) ---
    #[error("pool not ready")]
    PoolNotReady,

    #[error("pool exhausted: {0}")]
    PoolExhausted(String),

    #[error("transport error: {0}")]
    Transport(String),

    // --- Domain errors ---
    #[error("not found: {0}")]
    NotFound(String),

    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("contract violation: {0}")]
    ContractViolation(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("worker not ready")]
    WorkerNotReady,

    #[error("route not found")]
    RouteNotFound,

    #[error("cache error: {0}")]
    Cache(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Internal(String),
}

impl RuntimeError {
    /// HTTP status this error surfaces as, per spec.md §7's taxonomy.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::PoolNotReady | Self::PoolExhausted(_) | Self::Transport(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::NotFound(_) | Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::IntegrityViolation(_) => StatusCode::CONFLICT,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::WorkerNotReady => StatusCode::SERVICE_UNAVAILABLE,
            Self::ContractViolation(_) | Self::Cache(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether this error's message is safe to pass through to the client
    /// (a domain-level error) versus one that should be masked with a
    /// generic message in non-debug deployments.
    pub fn is_domain_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::IntegrityViolation(_)
                | Self::InvalidInput(_)
                | Self::RouteNotFound
        )
    }
}

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
