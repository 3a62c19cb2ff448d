use std::collections::HashMap;

use async_trait::async_trait;
use axum::response::Response;
use http::StatusCode;
use metrics_exporter_prometheus::PrometheusHandle;
use runtime_http::{Controller, RequestContext};

use super::respond;

/// `GET /metrics` (§6): the Prometheus text exposition of everything
/// recorded through the `metrics` facade (pool gauges, cache counters, task
/// histograms, request counters from `LoggingMiddleware`/the dispatcher).
pub struct MetricsController {
    handle: PrometheusHandle,
}

impl MetricsController {
    pub fn new(handle: PrometheusHandle) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl Controller for MetricsController {
    async fn call(&self, _ctx: &mut RequestContext, _params: &HashMap<String, String>) -> Response {
        respond::text(StatusCode::OK, self.handle.render())
    }
}
