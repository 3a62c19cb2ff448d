use std::sync::Arc;

use async_trait::async_trait;
use runtime_cache_table::CacheTable;
use runtime_common::ids::HexId;
use runtime_task::{TaskError, TaskHandler, METRICS_TASK_CLASS};
use serde_json::{json, Value};

/// The built-in metrics follow-up task (§4.6 Metrics, §4.7 recursion
/// guard). Its own execution never enqueues another `MetricsTask` —
/// [`crate::tasks::enqueue_metrics_followup`] is the only call site that
/// schedules one, and it refuses to schedule a `MetricsTask` from inside a
/// running `MetricsTask`.
pub struct MetricsTask {
    cache_table: Arc<CacheTable>,
}

impl MetricsTask {
    pub fn new(cache_table: Arc<CacheTable>) -> Self {
        Self { cache_table }
    }
}

#[async_trait]
impl TaskHandler for MetricsTask {
    fn class(&self) -> &'static str {
        METRICS_TASK_CLASS
    }

    async fn handle(&self, _id: HexId, arguments: &[Value]) -> Result<Value, TaskError> {
        let entries = self.cache_table.len().await;
        tracing::debug!(entries, "metrics follow-up task executed");
        Ok(json!({
            "cache_entries": entries,
            "source": arguments.first().cloned().unwrap_or(Value::Null),
        }))
    }
}
