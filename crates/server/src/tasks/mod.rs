//! Task handler registration (§4.6, §4.7): every class a `TaskEnvelope` can
//! name is constructed once per worker, with its repository/cache
//! dependencies injected, then registered against its `class()` string.

mod create_user;
mod delete_user;
mod metrics_task;
mod update_user;

use std::sync::Arc;

use runtime_cache_service::CacheService;
use runtime_cache_table::CacheTable;
use runtime_common::types::TaskEnvelope;
use runtime_repository::UserRepository;
use runtime_task::{guards_against_metrics_recursion, ChannelQueue, HandlerRegistry, METRICS_TASK_CLASS};
use serde_json::json;

pub use create_user::CreateUserTask;
pub use delete_user::DeleteUserTask;
pub use metrics_task::MetricsTask;
pub use update_user::UpdateUserTask;

pub fn register_all(
    registry: &mut HandlerRegistry,
    user_repo: Arc<UserRepository>,
    cache: Arc<CacheService>,
    cache_table: Arc<CacheTable>,
) {
    registry.register(Box::new(CreateUserTask::new(Arc::clone(&user_repo), Arc::clone(&cache))));
    registry.register(Box::new(UpdateUserTask::new(Arc::clone(&user_repo), Arc::clone(&cache))));
    registry.register(Box::new(DeleteUserTask::new(user_repo, cache)));
    registry.register(Box::new(MetricsTask::new(cache_table)));
}

/// Enqueues a `MetricsTask` follow-up after a completed task, guarded so a
/// metrics task can never schedule another one (§4.7 recursion guard). Every
/// HTTP-edge call site passes the class it just dispatched as
/// `current_class`; the guard only ever trips when that class is itself
/// `MetricsTask`, which none of the async-users routes ever enqueue directly.
pub fn enqueue_metrics_followup(channel: &ChannelQueue, current_class: &str) {
    if guards_against_metrics_recursion(current_class, METRICS_TASK_CLASS) {
        return;
    }

    let envelope = TaskEnvelope::new(METRICS_TASK_CLASS, vec![json!({ "source_class": current_class })]);
    if !channel.push(envelope) {
        tracing::warn!(class = current_class, "failed to enqueue metrics follow-up: channel full");
    }
}
