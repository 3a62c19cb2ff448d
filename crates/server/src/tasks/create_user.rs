use std::sync::Arc;

use async_trait::async_trait;
use runtime_cache_service::CacheService;
use runtime_common::ids::HexId;
use runtime_common::types::UserInput;
use runtime_repository::UserRepository;
use runtime_task::{TaskError, TaskHandler};
use serde_json::{json, Value};

const ENTITY: &str = "users";

/// Backs `POST /async-users` (§6, §8 scenario 5): runs the same create path
/// the synchronous `POST /users` controller does, off the request thread.
pub struct CreateUserTask {
    repo: Arc<UserRepository>,
    cache: Arc<CacheService>,
}

impl CreateUserTask {
    pub fn new(repo: Arc<UserRepository>, cache: Arc<CacheService>) -> Self {
        Self { repo, cache }
    }
}

#[async_trait]
impl TaskHandler for CreateUserTask {
    fn class(&self) -> &'static str {
        "CreateUserTask"
    }

    async fn handle(&self, _id: HexId, arguments: &[Value]) -> Result<Value, TaskError> {
        let input: UserInput = arguments
            .first()
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .ok_or_else(|| TaskError::ContractViolation("CreateUserTask expects a UserInput argument".to_string()))?;

        let user = self
            .repo
            .create(&input)
            .await
            .map_err(|e| TaskError::HandlerFailed(e.to_string()))?;

        if let Err(e) = self.cache.invalidate_lists(ENTITY).await {
            tracing::warn!(error = %e, "failed to invalidate user list cache after async create");
        }

        Ok(json!(user))
    }
}
