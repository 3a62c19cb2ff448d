use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use chrono::Utc;
use http::StatusCode;
use runtime_cache_table::CacheTable;
use runtime_common::types::{HealthResponse, ServerInfo};
use runtime_http::{Controller, RequestContext};
use runtime_worker::HeartbeatTable;

use super::respond;

/// Shared data every health-shaped controller reads (§6 `GET /health`,
/// `GET /health.html`): the cross-worker heartbeat table and shared cache
/// table, plus the static server identity.
pub struct HealthSource {
    pub heartbeat: HeartbeatTable,
    pub cache_table: Arc<CacheTable>,
    pub host: String,
    pub port: u16,
    pub start_ts: i64,
}

impl HealthSource {
    async fn snapshot(&self) -> HealthResponse {
        let now = Utc::now().timestamp();
        let workers = self.heartbeat.snapshot().await;
        let cache = self.cache_table.stats().await;
        let cache_data = self.cache_table.keys().await;

        HealthResponse {
            ok: workers.iter().any(|w| w.is_alive(now)),
            uptime: (now - self.start_ts).max(0),
            ts: now,
            pid: std::process::id(),
            workers_count: workers.len(),
            workers,
            cache,
            cache_count: cache_data.len(),
            cache_data,
            server: ServerInfo {
                host: self.host.clone(),
                port: self.port,
            },
        }
    }
}

/// `GET /health` (§6): the `HealthResponse` JSON body.
pub struct HealthController {
    source: Arc<HealthSource>,
}

impl HealthController {
    pub fn new(source: Arc<HealthSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Controller for HealthController {
    async fn call(&self, _ctx: &mut RequestContext, _params: &HashMap<String, String>) -> Response {
        let body = self.source.snapshot().await;
        let status = if body.ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
        respond::json(status, &body)
    }
}

/// `GET /health.html` (§6): the same data, rendered as a minimal HTML page
/// rather than JSON.
pub struct HealthHtmlController {
    source: Arc<HealthSource>,
}

impl HealthHtmlController {
    pub fn new(source: Arc<HealthSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Controller for HealthHtmlController {
    async fn call(&self, _ctx: &mut RequestContext, _params: &HashMap<String, String>) -> Response {
        let body = self.source.snapshot().await;
        let status = if body.ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

        let rows: String = body
            .workers
            .iter()
            .map(|w| {
                format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    w.worker_id, w.pid, w.first_heartbeat, w.last_heartbeat
                )
            })
            .collect();

        let html = format!(
            "<!doctype html><html><head><title>runtime-server health</title></head><body>\
             <h1>{}</h1>\
             <p>uptime: {}s, pid: {}, workers: {}</p>\
             <table border=\"1\"><thead><tr><th>worker</th><th>pid</th><th>first heartbeat</th><th>last heartbeat</th></tr></thead>\
             <tbody>{}</tbody></table>\
             <p>cache entries: {} / capacity {}</p>\
             </body></html>",
            if body.ok { "healthy" } else { "unhealthy" },
            body.uptime,
            body.pid,
            body.workers_count,
            rows,
            body.cache_count,
            body.cache.capacity,
        );

        respond::html(status, html)
    }
}
