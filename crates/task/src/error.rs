use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    /// `class` has no registered handler, or the handler failed its
    /// contract assertion (§4.6 `handle`).
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// The handler ran and returned an application-level failure.
    #[error("handler failed: {0}")]
    HandlerFailed(String),

    /// The in-process channel was at capacity (§4.7 `push`).
    #[error("task channel full")]
    ChannelFull,

    #[error(transparent)]
    Pool(#[from] runtime_pool::PoolError),
}

impl From<TaskError> for runtime_common::RuntimeError {
    fn from(e: TaskError) -> Self {
        match e {
            TaskError::ContractViolation(msg) => runtime_common::RuntimeError::ContractViolation(msg),
            TaskError::HandlerFailed(msg) => runtime_common::RuntimeError::Internal(msg),
            TaskError::ChannelFull => {
                runtime_common::RuntimeError::Internal("task channel full".to_string())
            }
            TaskError::Pool(p) => p.into(),
        }
    }
}
