use std::collections::HashMap;

use async_trait::async_trait;
use axum::response::Response;

use crate::context::RequestContext;

/// One HTTP handler family (§9 DESIGN NOTES: dynamic `class@method`
/// dispatch replaced with a typed interface per handler family, resolved
/// through a static registry built at worker-start rather than reflection).
///
/// Implementors already own every dependency they need (repository, cache
/// service, channel queue) via constructor injection at registration time —
/// the container is consulted once, when the route table is built, not on
/// every request.
#[async_trait]
pub trait Controller: Send + Sync {
    async fn call(&self, ctx: &mut RequestContext, params: &HashMap<String, String>) -> Response;
}
