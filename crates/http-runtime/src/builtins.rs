//! The built-in global middlewares, in registration order (§4.3):
//! logging, server-header suppression, security headers, CORS (short-
//! circuits `OPTIONS` with 204), rate limiting, compression.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::Body;
use axum::response::Response;
use http::{HeaderValue, Method, StatusCode};
use tokio::sync::Mutex;

use crate::context::RequestContext;
use crate::middleware::{Middleware, Next};

/// Logs method/path/status/duration/req_id for every request.
pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        let method = ctx.method.clone();
        let path = ctx.path.clone();
        let req_id = ctx.req_id;

        let response = next.proceed(ctx).await;

        tracing::info!(
            req_id = %req_id,
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            elapsed_ms = ctx.elapsed_ms(),
            "request handled"
        );
        response
    }
}

/// Strips any `Server` header a downstream layer set, so the runtime never
/// leaks its stack identity.
pub struct ServerHeaderMiddleware;

#[async_trait]
impl Middleware for ServerHeaderMiddleware {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        let mut response = next.proceed(ctx).await;
        response.headers_mut().remove(http::header::SERVER);
        response
    }
}

/// Attaches a fixed set of security headers to every response.
pub struct SecurityHeadersMiddleware;

#[async_trait]
impl Middleware for SecurityHeadersMiddleware {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        let mut response = next.proceed(ctx).await;
        let headers = response.headers_mut();
        headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
        headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
        headers.insert(
            "referrer-policy",
            HeaderValue::from_static("no-referrer"),
        );
        response
    }
}

/// Permissive CORS: reflects `Access-Control-Allow-Origin: *`, short-
/// circuits `OPTIONS` preflights with 204 (§4.3).
pub struct CorsMiddleware;

#[async_trait]
impl Middleware for CorsMiddleware {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        if ctx.method == Method::OPTIONS {
            let mut response = Response::builder()
                .status(StatusCode::NO_CONTENT)
                .body(Body::empty())
                .expect("valid response");
            apply_cors_headers(&mut response);
            return response;
        }

        let mut response = next.proceed(ctx).await;
        apply_cors_headers(&mut response);
        response
    }
}

fn apply_cors_headers(response: &mut Response) {
    let headers = response.headers_mut();
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,PUT,DELETE,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type"),
    );
}

/// Fixed-window per-path rate limiter: `limit` requests per `window`.
/// Exceeding it short-circuits with 429.
pub struct RateLimitMiddleware {
    limit: u64,
    window: Duration,
    windows: Mutex<HashMap<String, (Instant, AtomicU64)>>,
}

impl RateLimitMiddleware {
    pub fn new(limit: u64, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl Middleware for RateLimitMiddleware {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        let key = ctx.path.clone();
        let now = Instant::now();

        let exceeded = {
            let mut windows = self.windows.lock().await;
            let entry = windows
                .entry(key)
                .or_insert_with(|| (now, AtomicU64::new(0)));

            if now.duration_since(entry.0) > self.window {
                entry.0 = now;
                entry.1.store(0, Ordering::SeqCst);
            }

            entry.1.fetch_add(1, Ordering::SeqCst) + 1 > self.limit
        };

        if exceeded {
            return Response::builder()
                .status(StatusCode::TOO_MANY_REQUESTS)
                .body(Body::from("{\"error\":\"rate limit exceeded\"}"))
                .expect("valid response");
        }

        next.proceed(ctx).await
    }
}

/// A no-op placeholder at the tail of the global chain. This middleware
/// exists so the chain's registration order matches spec.md §4.3 exactly;
/// body compression itself is out of scope (§1 Non-goals: thin response
/// framing is not elaborated).
pub struct CompressionMiddleware;

#[async_trait]
impl Middleware for CompressionMiddleware {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        next.proceed(ctx).await
    }
}

/// The global middleware chain in spec.md §4.3's order.
pub fn global_chain(rate_limit: Arc<RateLimitMiddleware>) -> Vec<Arc<dyn Middleware>> {
    vec![
        Arc::new(LoggingMiddleware),
        Arc::new(ServerHeaderMiddleware),
        Arc::new(SecurityHeadersMiddleware),
        Arc::new(CorsMiddleware),
        rate_limit,
        Arc::new(CompressionMiddleware),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{Pipeline, Terminal};
    use http::HeaderMap;
    use std::collections::HashMap as Map;

    struct Ok200;

    #[async_trait]
    impl Terminal for Ok200 {
        async fn call(&self, _ctx: &mut RequestContext) -> Response {
            Response::new(Body::empty())
        }
    }

    fn ctx(method: Method) -> RequestContext {
        RequestContext::new(method, "/x".to_string(), Map::new(), HeaderMap::new(), Default::default())
    }

    #[tokio::test]
    async fn cors_short_circuits_options_with_204() {
        let pipeline = Pipeline::new(vec![Arc::new(CorsMiddleware)]);
        let response = pipeline.run(&mut ctx(Method::OPTIONS), &Ok200).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn rate_limit_rejects_beyond_threshold() {
        let rl = RateLimitMiddleware::new(2, Duration::from_secs(60));
        let pipeline = Pipeline::new(vec![Arc::new(rl)]);

        let r1 = pipeline.run(&mut ctx(Method::GET), &Ok200).await;
        let r2 = pipeline.run(&mut ctx(Method::GET), &Ok200).await;
        let r3 = pipeline.run(&mut ctx(Method::GET), &Ok200).await;

        assert_eq!(r1.status(), StatusCode::OK);
        assert_eq!(r2.status(), StatusCode::OK);
        assert_eq!(r3.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn security_headers_are_attached() {
        let pipeline = Pipeline::new(vec![Arc::new(SecurityHeadersMiddleware)]);
        let response = pipeline.run(&mut ctx(Method::GET), &Ok200).await;
        assert_eq!(
            response.headers().get("x-frame-options").unwrap(),
            "DENY"
        );
    }
}
