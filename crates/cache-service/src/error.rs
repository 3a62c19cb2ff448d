use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheServiceError {
    #[error(transparent)]
    Pool(#[from] runtime_pool::PoolError),
}

impl From<CacheServiceError> for runtime_common::RuntimeError {
    fn from(e: CacheServiceError) -> Self {
        match e {
            CacheServiceError::Pool(p) => p.into(),
        }
    }
}
