use std::collections::HashMap;

use runtime_common::ids::HexId;
use serde_json::Value;

use crate::error::TaskError;

/// Class identity of the built-in metrics follow-up task, used by the
/// recursion guard (§4.6 Metrics, §4.7 Recursion guard): dispatching a
/// metrics task must never enqueue another metrics task, and a metrics
/// task's own execution is excluded from `task_requests_total`/
/// `task_request_seconds` to avoid metrics-about-metrics feedback.
pub const METRICS_TASK_CLASS: &str = "MetricsTask";

/// Whether enqueuing a follow-up task for `current_class` would violate the
/// metrics recursion guard (§4.7).
pub fn guards_against_metrics_recursion(current_class: &str, follow_up_class: &str) -> bool {
    follow_up_class == METRICS_TASK_CLASS && current_class == METRICS_TASK_CLASS
}

/// The task contract every handler class must implement (§4.6 `handle`):
/// resolve by class, assert the contract, invoke, publish outcome.
#[async_trait::async_trait]
pub trait TaskHandler: Send + Sync {
    /// The identifier this handler is registered under.
    fn class(&self) -> &'static str;

    async fn handle(&self, id: HexId, arguments: &[Value]) -> Result<Value, TaskError>;

    /// Optional task-defined error path (§4.6 `error(throwable, id, ...arguments)`).
    /// Returning `Some` publishes its result as a success outcome; the
    /// default (`None`) means the caller publishes a failure outcome
    /// carrying the error message.
    async fn on_error(&self, _error: &TaskError, _id: HexId, _arguments: &[Value]) -> Option<Value> {
        None
    }
}

/// Static handler registry built at worker-start from a fixed list (§9
/// DESIGN NOTES: dynamic `class@method` dispatch replaced with a typed,
/// statically-built registry).
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Box<dyn TaskHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Box<dyn TaskHandler>) {
        self.handlers.insert(handler.class(), handler);
    }

    pub fn get(&self, class: &str) -> Option<&dyn TaskHandler> {
        self.handlers.get(class).map(|h| h.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_task_scheduling_itself_is_guarded() {
        assert!(guards_against_metrics_recursion(
            METRICS_TASK_CLASS,
            METRICS_TASK_CLASS
        ));
    }

    #[test]
    fn metrics_task_scheduling_something_else_is_not_guarded() {
        assert!(!guards_against_metrics_recursion(METRICS_TASK_CLASS, "CreateUser"));
    }

    #[test]
    fn non_metrics_task_scheduling_metrics_task_is_not_guarded() {
        assert!(!guards_against_metrics_recursion("CreateUser", METRICS_TASK_CLASS));
    }

    #[test]
    fn unrelated_classes_are_never_guarded() {
        assert!(!guards_against_metrics_recursion("CreateUser", "DeleteUser"));
    }
}
