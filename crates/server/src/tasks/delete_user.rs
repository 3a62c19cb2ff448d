use std::sync::Arc;

use async_trait::async_trait;
use runtime_cache_service::CacheService;
use runtime_common::ids::HexId;
use runtime_repository::UserRepository;
use runtime_task::{TaskError, TaskHandler};
use serde_json::{json, Value};

const ENTITY: &str = "users";

/// Backs `DELETE /async-users/{id}` (§6): `arguments` is `[id]`.
pub struct DeleteUserTask {
    repo: Arc<UserRepository>,
    cache: Arc<CacheService>,
}

impl DeleteUserTask {
    pub fn new(repo: Arc<UserRepository>, cache: Arc<CacheService>) -> Self {
        Self { repo, cache }
    }
}

#[async_trait]
impl TaskHandler for DeleteUserTask {
    fn class(&self) -> &'static str {
        "DeleteUserTask"
    }

    async fn handle(&self, _id: HexId, arguments: &[Value]) -> Result<Value, TaskError> {
        let id = arguments
            .first()
            .and_then(|v| v.as_i64())
            .ok_or_else(|| TaskError::ContractViolation("DeleteUserTask expects a numeric id as arguments[0]".to_string()))?;

        let deleted = self
            .repo
            .delete(id.into())
            .await
            .map_err(|e| TaskError::HandlerFailed(e.to_string()))?;

        if !deleted {
            return Err(TaskError::HandlerFailed(format!("user {id} not found")));
        }

        if let Err(e) = self.cache.invalidate_record(ENTITY, &id.to_string()).await {
            tracing::warn!(error = %e, "failed to invalidate user record cache after async delete");
        }
        if let Err(e) = self.cache.invalidate_lists(ENTITY).await {
            tracing::warn!(error = %e, "failed to invalidate user list cache after async delete");
        }

        Ok(json!({ "id": id, "deleted": true }))
    }
}
