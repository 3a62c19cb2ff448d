use std::collections::HashMap;

use axum::body::Bytes;
use chrono::Utc;
use http::{HeaderMap, Method};
use runtime_common::ids::HexId;

/// `{request, response, req_id, start_ts}` (§3). Passed by `&mut` reference
/// through the middleware chain and the dispatcher; a controller writes its
/// output by returning an `axum::response::Response` rather than mutating a
/// shared response object, so this only carries read side state plus the
/// bookkeeping every middleware wants (request id, timing, cache provenance).
pub struct RequestContext {
    pub method: Method,
    /// Path with the query string already stripped (§4.2 `match`).
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub req_id: HexId,
    pub start_ts: i64,
    /// Set once the router matches, for logging/metrics labeling (§4.2 `lookup`).
    pub route_template: Option<String>,
    /// Cache provenance tag a handler sets so a middleware (or the handler
    /// itself) can attach the `X-Cache-Type` header (§6).
    pub cache_type: Option<&'static str>,
}

impl RequestContext {
    pub fn new(method: Method, path: String, query: HashMap<String, String>, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            path,
            query,
            headers,
            body,
            req_id: HexId::generate(),
            start_ts: Utc::now().timestamp_millis(),
            route_template: None,
            cache_type: None,
        }
    }

    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now().timestamp_millis() - self.start_ts).max(0)
    }
}
