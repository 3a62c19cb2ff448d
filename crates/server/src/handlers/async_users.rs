use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use http::{Method, StatusCode};
use runtime_common::types::{TaskEnvelope, UserInput};
use runtime_common::RuntimeError;
use runtime_http::{error_response, Controller, RequestContext};
use runtime_task::ChannelQueue;
use serde_json::{json, Value};

use super::common::{extract_tail_id, parse_body};
use super::respond;
use crate::tasks::enqueue_metrics_followup;

const PATH_PREFIX: &str = "/async-users";

/// `POST|PUT|DELETE /async-users*` (§6): enqueues to the in-process channel
/// and responds `202 {message, jobId, result}` without waiting for the task
/// to run. `PUT`/`DELETE` carry their target row id as the wildcard path's
/// trailing segment, since the route has no named capture group.
pub struct AsyncUsersController {
    channel: Arc<ChannelQueue>,
    debug: bool,
}

impl AsyncUsersController {
    pub fn new(channel: Arc<ChannelQueue>, debug: bool) -> Self {
        Self { channel, debug }
    }
}

#[async_trait]
impl Controller for AsyncUsersController {
    async fn call(&self, ctx: &mut RequestContext, _params: &HashMap<String, String>) -> Response {
        let (class, arguments) = match ctx.method.clone() {
            Method::POST => {
                let input: UserInput = match parse_body(&ctx.body) {
                    Ok(v) => v,
                    Err(e) => return error_response(&e, self.debug),
                };
                ("CreateUserTask", vec![serde_json::to_value(&input).unwrap_or(Value::Null)])
            }
            Method::PUT => {
                let id = match extract_tail_id(&ctx.path, PATH_PREFIX) {
                    Some(id) => id,
                    None => {
                        return error_response(
                            &RuntimeError::InvalidInput("missing user id in path".to_string()),
                            self.debug,
                        )
                    }
                };
                let input: UserInput = match parse_body(&ctx.body) {
                    Ok(v) => v,
                    Err(e) => return error_response(&e, self.debug),
                };
                (
                    "UpdateUserTask",
                    vec![json!(id), serde_json::to_value(&input).unwrap_or(Value::Null)],
                )
            }
            Method::DELETE => {
                let id = match extract_tail_id(&ctx.path, PATH_PREFIX) {
                    Some(id) => id,
                    None => {
                        return error_response(
                            &RuntimeError::InvalidInput("missing user id in path".to_string()),
                            self.debug,
                        )
                    }
                };
                ("DeleteUserTask", vec![json!(id)])
            }
            _ => return error_response(&RuntimeError::RouteNotFound, self.debug),
        };

        let envelope = TaskEnvelope::new(class, arguments);
        let job_id = envelope.id;

        if !self.channel.push(envelope) {
            return error_response(&RuntimeError::Internal("task channel full".to_string()), self.debug);
        }
        enqueue_metrics_followup(&self.channel, class);

        respond::json(
            StatusCode::ACCEPTED,
            &json!({
                "message": "enqueued",
                "jobId": job_id.to_string(),
                "result": Value::Null,
            }),
        )
    }
}
