use thiserror::Error;

/// Router-internal failures (§4.2). Kept distinct from `RuntimeError` so the
/// router never throws for control flow (§9 DESIGN NOTES) — callers match on
/// this sum type and translate to HTTP status only at the dispatch edge.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("no route matches method/path")]
    NotFound,
}

impl From<RouterError> for runtime_common::RuntimeError {
    fn from(_: RouterError) -> Self {
        runtime_common::RuntimeError::RouteNotFound
    }
}

/// DI container failures (§4.4).
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("no binding registered for {0}")]
    Unbound(&'static str),

    #[error("dependency cycle detected while resolving {0}")]
    Cycle(&'static str),

    #[error("binding for {0} resolved to the wrong type")]
    TypeMismatch(&'static str),
}

impl From<ContainerError> for runtime_common::RuntimeError {
    fn from(e: ContainerError) -> Self {
        runtime_common::RuntimeError::Internal(e.to_string())
    }
}
