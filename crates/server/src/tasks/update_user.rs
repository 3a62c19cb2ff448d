use std::sync::Arc;

use async_trait::async_trait;
use runtime_cache_service::CacheService;
use runtime_common::ids::HexId;
use runtime_common::types::UserInput;
use runtime_repository::UserRepository;
use runtime_task::{TaskError, TaskHandler};
use serde_json::{json, Value};

const ENTITY: &str = "users";

/// Backs `PUT /async-users/{id}` (§6): `arguments` is `[id, UserInput]`.
pub struct UpdateUserTask {
    repo: Arc<UserRepository>,
    cache: Arc<CacheService>,
}

impl UpdateUserTask {
    pub fn new(repo: Arc<UserRepository>, cache: Arc<CacheService>) -> Self {
        Self { repo, cache }
    }
}

#[async_trait]
impl TaskHandler for UpdateUserTask {
    fn class(&self) -> &'static str {
        "UpdateUserTask"
    }

    async fn handle(&self, _id: HexId, arguments: &[Value]) -> Result<Value, TaskError> {
        let id = arguments
            .first()
            .and_then(|v| v.as_i64())
            .ok_or_else(|| TaskError::ContractViolation("UpdateUserTask expects a numeric id as arguments[0]".to_string()))?;

        let input: UserInput = arguments
            .get(1)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .ok_or_else(|| TaskError::ContractViolation("UpdateUserTask expects a UserInput as arguments[1]".to_string()))?;

        let updated = self
            .repo
            .update(id.into(), &input)
            .await
            .map_err(|e| TaskError::HandlerFailed(e.to_string()))?;

        if !updated {
            return Err(TaskError::HandlerFailed(format!("user {id} not found")));
        }

        if let Err(e) = self.cache.invalidate_record(ENTITY, &id.to_string()).await {
            tracing::warn!(error = %e, "failed to invalidate user record cache after async update");
        }
        if let Err(e) = self.cache.invalidate_lists(ENTITY).await {
            tracing::warn!(error = %e, "failed to invalidate user list cache after async update");
        }

        let user = self
            .repo
            .find(id.into())
            .await
            .map_err(|e| TaskError::HandlerFailed(e.to_string()))?
            .ok_or_else(|| TaskError::HandlerFailed(format!("user {id} not found")))?;

        Ok(json!(user))
    }
}
