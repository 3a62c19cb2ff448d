use std::collections::HashMap;

use async_trait::async_trait;
use axum::body::Body;
use axum::response::Response;
use http::StatusCode;
use runtime_common::types::ErrorResponse;
use runtime_common::RuntimeError;

use crate::context::RequestContext;
use crate::middleware::{Pipeline, Terminal};
use crate::router::Router;

/// Builds the JSON `{error, error_full, code, ...}` body (§6, §7) — the
/// one place an error is translated to an HTTP response, exactly spec.md
/// §7's "the request handler's outermost `catch`".
pub fn error_response(err: &RuntimeError, debug: bool) -> Response {
    let status = err.status_code();
    let message = if err.is_domain_error() {
        err.to_string()
    } else {
        "An internal error occurred".to_string()
    };

    let body = ErrorResponse {
        error: message,
        error_full: if debug { Some(err.to_string()) } else { None },
        code: status.as_u16(),
        trace: None,
        file: None,
        line: None,
    };

    let json = serde_json::to_vec(&body).unwrap_or_else(|_| b"{}".to_vec());
    Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(json))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

/// Terminal for the route-scoped chain (§4.3): invokes the matched
/// controller with its extracted params.
struct DispatchTerminal {
    matched: crate::router::Matched,
}

#[async_trait]
impl Terminal for DispatchTerminal {
    async fn call(&self, ctx: &mut RequestContext) -> Response {
        self.matched.action.call(ctx, &self.matched.params).await
    }
}

/// Terminal for the global chain (§4.3): resolves the route, then runs the
/// route-scoped chain with the dispatcher as its terminal. Failing to
/// match produces the 404 JSON error body directly — spec.md §9 replaces
/// "throw `RouteNotFoundException`" with a result sum type internally, and
/// this is the one place that gets translated to an HTTP status.
struct RouteResolutionTerminal<'a> {
    router: &'a Router,
    debug: bool,
}

#[async_trait]
impl<'a> Terminal for RouteResolutionTerminal<'a> {
    async fn call(&self, ctx: &mut RequestContext) -> Response {
        match self.router.match_request(ctx.method.as_str(), &ctx.path) {
            Ok(matched) => {
                ctx.route_template = Some(matched.route_template.clone());
                let route_pipeline = Pipeline::new(matched.middleware.clone());
                let terminal = DispatchTerminal { matched };
                route_pipeline.run(ctx, &terminal).await
            }
            Err(e) => error_response(&e.into(), self.debug),
        }
    }
}

/// Runs a complete request through the runtime core (§2 dataflow): global
/// middleware chain → router match → route-scoped middleware chain →
/// dispatcher → controller. Returns the 404/500 JSON error body itself
/// when routing fails, so callers (the axum fallback service in the
/// `server` crate) never need their own error-mapping layer.
pub async fn handle(router: &Router, global: &Pipeline, ctx: &mut RequestContext, debug: bool) -> Response {
    let terminal = RouteResolutionTerminal { router, debug };
    let response = global.run(ctx, &terminal).await;

    apply_cache_header(response, ctx.cache_type)
}

fn apply_cache_header(mut response: Response, cache_type: Option<&'static str>) -> Response {
    if let Some(tag) = cache_type {
        if let Ok(value) = http::HeaderValue::from_str(tag) {
            response.headers_mut().insert("x-cache-type", value);
        }
    }
    response
}

/// Convenience extractor turning an axum `Request` into the pieces
/// `RequestContext::new` needs — kept here (rather than the `server`
/// crate) so every axum-shaped concern funnels through one boundary.
pub async fn context_from_request(req: axum::extract::Request) -> (RequestContext, StatusCode) {
    let (parts, body) = req.into_parts();
    let query = parts
        .uri
        .query()
        .map(parse_query)
        .unwrap_or_default();

    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(_) => {
            return (
                RequestContext::new(
                    parts.method.clone(),
                    parts.uri.path().to_string(),
                    query,
                    parts.headers.clone(),
                    Default::default(),
                ),
                StatusCode::BAD_REQUEST,
            );
        }
    };

    (
        RequestContext::new(parts.method, parts.uri.path().to_string(), query, parts.headers, body_bytes),
        StatusCode::OK,
    )
}

fn parse_query(raw: &str) -> HashMap<String, String> {
    raw.split('&')
        .filter(|p| !p.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let k = parts.next()?;
            let v = parts.next().unwrap_or("");
            Some((
                urlencoding_decode(k),
                urlencoding_decode(v),
            ))
        })
        .collect()
}

/// Percent-decoding for querystring keys/values: `+`-as-space is
/// form-encoding's own convention (not part of RFC 3986 percent-encoding,
/// so `urlencoding` doesn't apply it), handled first; the remaining `%XX`
/// escapes are decoded as UTF-8 byte sequences by `urlencoding::decode`
/// rather than cast byte-by-byte to `char`, so a multi-byte sequence like
/// `%C3%A9` recombines into a single codepoint instead of mojibake.
fn urlencoding_decode(s: &str) -> String {
    let space_decoded = s.replace('+', " ");
    urlencoding::decode(&space_decoded)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(space_decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_parsing_decodes_percent_and_plus() {
        let parsed = parse_query("name=a+b&email=a%40b.com");
        assert_eq!(parsed.get("name"), Some(&"a b".to_string()));
        assert_eq!(parsed.get("email"), Some(&"a@b.com".to_string()));
    }

    #[test]
    fn query_parsing_decodes_multi_byte_utf8_sequences() {
        let parsed = parse_query("name=caf%C3%A9");
        assert_eq!(parsed.get("name"), Some(&"café".to_string()));
    }

    #[test]
    fn error_response_masks_internal_errors_unless_debug() {
        let err = RuntimeError::Internal("db connection string leaked".to_string());
        let response = error_response(&err, false);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
