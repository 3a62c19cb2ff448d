use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A filter referenced a field outside the where-builder's allowlist (§4.10).
    #[error("invalid filter field: {0}")]
    InvalidFilter(String),

    /// A sort column outside the order-by builder's allowlist (§4.10).
    #[error("invalid sort column: {0}")]
    InvalidColumn(String),

    /// A filter value couldn't be coerced to the type its column expects.
    #[error("invalid filter value: {0}")]
    InvalidValue(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error(transparent)]
    Pool(#[from] runtime_pool::PoolError),
}

impl From<RepositoryError> for runtime_common::RuntimeError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::InvalidFilter(m)
            | RepositoryError::InvalidColumn(m)
            | RepositoryError::InvalidValue(m) => runtime_common::RuntimeError::InvalidInput(m),
            RepositoryError::NotFound(m) => runtime_common::RuntimeError::NotFound(m),
            RepositoryError::Query(m) => runtime_common::RuntimeError::Internal(m),
            RepositoryError::Pool(p) => p.into(),
        }
    }
}
