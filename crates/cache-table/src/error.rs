use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheTableError {
    #[error("failed to write cache entry: {0}")]
    SetError(String),
}

impl From<CacheTableError> for runtime_common::RuntimeError {
    fn from(e: CacheTableError) -> Self {
        match e {
            CacheTableError::SetError(msg) => runtime_common::RuntimeError::Cache(msg),
        }
    }
}
