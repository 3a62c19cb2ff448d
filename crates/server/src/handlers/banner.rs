use std::collections::HashMap;

use async_trait::async_trait;
use axum::response::Response;
use http::StatusCode;
use runtime_http::{Controller, RequestContext};
use serde_json::json;

use super::respond;

/// `GET /` (§6): a static identity banner, no dependencies.
pub struct BannerController;

#[async_trait]
impl Controller for BannerController {
    async fn call(&self, _ctx: &mut RequestContext, _params: &HashMap<String, String>) -> Response {
        respond::json(
            StatusCode::OK,
            &json!({
                "name": "runtime-server",
                "status": "ok",
            }),
        )
    }
}
