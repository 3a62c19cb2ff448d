use std::time::Instant;

use runtime_common::types::TaskEnvelope;

use crate::handler::{HandlerRegistry, METRICS_TASK_CLASS};
use runtime_common::types::TaskOutcome;

/// Resolve `envelope.class` in the registry, assert it exists, invoke the
/// handler, and build the published outcome (§4.6 `handle`). Shared by both
/// the in-process channel consumer (§4.7) and the cross-worker queue
/// consumer (§4.6), since both publish the same `TaskOutcome` shape.
pub async fn execute(registry: &HandlerRegistry, envelope: &TaskEnvelope) -> TaskOutcome {
    let is_metrics_class = envelope.class == METRICS_TASK_CLASS;

    let handler = match registry.get(&envelope.class) {
        Some(h) => h,
        None => {
            let msg = format!("no handler registered for class \"{}\"", envelope.class);
            tracing::error!(class = %envelope.class, id = %envelope.id, "task contract violation: {msg}");
            return TaskOutcome::failure(envelope, msg);
        }
    };

    let start = Instant::now();
    let result = handler.handle(envelope.id, &envelope.arguments).await;
    let elapsed = start.elapsed();

    if !is_metrics_class {
        let status = if result.is_ok() { "success" } else { "error" };
        metrics::counter!("task_requests_total", "class" => envelope.class.clone(), "status" => status)
            .increment(1);
        metrics::histogram!("task_request_seconds", "class" => envelope.class.clone())
            .record(elapsed.as_secs_f64());
    }

    match result {
        Ok(value) => TaskOutcome::success(envelope, value),
        Err(e) => match handler.on_error(&e, envelope.id, &envelope.arguments).await {
            Some(value) => TaskOutcome::success(envelope, value),
            None => {
                tracing::error!(class = %envelope.class, id = %envelope.id, error = %e, "task failed");
                TaskOutcome::failure(envelope, e.to_string())
            }
        },
    }
}

/// Callback on the originating worker (§4.6 `finish`): parse the outcome,
/// log any error. Multi-step chaining is a future extension, not built here.
pub fn finish(outcome: &TaskOutcome) {
    match &outcome.error {
        Some(err) => {
            tracing::error!(class = %outcome.class, id = %outcome.id, error = %err, "task finished with error");
        }
        None => {
            tracing::debug!(class = %outcome.class, id = %outcome.id, "task finished");
        }
    }
}
