use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use crate::controller::Controller;
use crate::error::RouterError;
use crate::middleware::Middleware;

/// One compiled route: `{method, compiled_pattern, param_names[], action,
/// middleware_chain[]}` (§3, §4.2).
struct Route {
    regex: Regex,
    param_names: Vec<String>,
    path_template: String,
    action: Arc<dyn Controller>,
    middleware: Vec<Arc<dyn Middleware>>,
}

/// The result of a successful `match_request` (§4.2 `match`).
pub struct Matched {
    pub action: Arc<dyn Controller>,
    pub params: HashMap<String, String>,
    pub middleware: Vec<Arc<dyn Middleware>>,
    pub route_template: String,
}

/// The matched route's template, for metrics labeling without invoking the
/// handler (§4.2 `lookup`).
pub struct RouteDescriptor {
    pub method: String,
    pub path_template: String,
}

/// Regex-compiled router, method lookup case-insensitive, first-registered-
/// wins within a method (§3, §4.2).
#[derive(Default)]
pub struct Router {
    // Keyed by upper-cased method name rather than `http::Method` so lookup
    // stays case-insensitive without re-validating HTTP method token casing.
    routes: HashMap<String, Vec<Route>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// `add(method, path, action, mw[])` (§4.2). `path` may use `{name}`
    /// placeholders (each compiled to `[^/]+`) and end in a bare `*` for a
    /// wildcard suffix match (used by `/async-users*`, §6).
    pub fn add(
        &mut self,
        method: impl AsRef<str>,
        path: &str,
        action: Arc<dyn Controller>,
        middleware: Vec<Arc<dyn Middleware>>,
    ) {
        let (regex, param_names) = compile_pattern(path);
        self.routes
            .entry(method.as_ref().to_ascii_uppercase())
            .or_default()
            .push(Route {
                regex,
                param_names,
                path_template: path.to_string(),
                action,
                middleware,
            });
    }

    /// `match(method, uri)` (§4.2): strips the query string, iterates routes
    /// for that method in registration order, first regex match wins.
    pub fn match_request(&self, method: impl AsRef<str>, uri: &str) -> Result<Matched, RouterError> {
        let path = strip_query(uri);
        let routes = self
            .routes
            .get(&method.as_ref().to_ascii_uppercase())
            .ok_or(RouterError::NotFound)?;

        for route in routes {
            if let Some(captures) = route.regex.captures(path) {
                let mut params = HashMap::with_capacity(route.param_names.len());
                for name in &route.param_names {
                    if let Some(m) = captures.name(name) {
                        params.insert(name.clone(), m.as_str().to_string());
                    }
                }
                return Ok(Matched {
                    action: Arc::clone(&route.action),
                    params,
                    middleware: route.middleware.clone(),
                    route_template: route.path_template.clone(),
                });
            }
        }
        Err(RouterError::NotFound)
    }

    /// `lookup(method, uri)` (§4.2): the matched descriptor without
    /// invoking the handler, for metrics labeling.
    pub fn lookup(&self, method: impl AsRef<str>, uri: &str) -> Result<RouteDescriptor, RouterError> {
        let path = strip_query(uri);
        let method = method.as_ref().to_ascii_uppercase();
        let routes = self.routes.get(&method).ok_or(RouterError::NotFound)?;

        for route in routes {
            if route.regex.is_match(path) {
                return Ok(RouteDescriptor {
                    method: method.clone(),
                    path_template: route.path_template.clone(),
                });
            }
        }
        Err(RouterError::NotFound)
    }
}

fn strip_query(uri: &str) -> &str {
    uri.split('?').next().unwrap_or(uri)
}

/// Compile a `{name}`-templated path into an anchored regex. A trailing `*`
/// (e.g. `/async-users*`) drops the end anchor and matches any suffix.
fn compile_pattern(path: &str) -> (Regex, Vec<String>) {
    let (body, wildcard) = match path.strip_suffix('*') {
        Some(stripped) => (stripped, true),
        None => (path, false),
    };

    let mut param_names = Vec::new();
    let mut pattern = String::from("^");
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '{' {
            let mut name = String::new();
            for nc in chars.by_ref() {
                if nc == '}' {
                    break;
                }
                name.push(nc);
            }
            pattern.push_str(&format!("(?P<{name}>[^/]+)"));
            param_names.push(name);
        } else {
            pattern.push_str(&regex::escape(&c.to_string()));
        }
    }

    if wildcard {
        pattern.push_str(".*");
    }
    pattern.push('$');

    (Regex::new(&pattern).expect("route pattern compiles"), param_names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use async_trait::async_trait;

    struct Stub;

    #[async_trait]
    impl Controller for Stub {
        async fn call(&self, _ctx: &mut RequestContext, _params: &HashMap<String, String>) -> axum::response::Response {
            axum::response::Response::new(axum::body::Body::empty())
        }
    }

    fn stub() -> Arc<dyn Controller> {
        Arc::new(Stub)
    }

    #[test]
    fn matches_static_and_extracts_params() {
        let mut router = Router::new();
        router.add("GET", "/users/{id}", stub(), vec![]);

        let matched = router.match_request("get", "/users/42?x=1").unwrap();
        assert_eq!(matched.params.get("id"), Some(&"42".to_string()));
    }

    #[test]
    fn method_lookup_is_case_insensitive() {
        let mut router = Router::new();
        router.add("GET", "/health", stub(), vec![]);
        assert!(router.match_request("get", "/health").is_ok());
    }

    #[test]
    fn first_registered_route_wins() {
        let mut router = Router::new();
        router.add("GET", "/users/{id}", stub(), vec![]);
        router.add("GET", "/users/email/{email}", stub(), vec![]);

        // "/users/email/x" matches both patterns; registration order decides.
        let matched = router.match_request("GET", "/users/email/x").unwrap();
        assert_eq!(matched.params.get("id"), Some(&"email".to_string()));
    }

    #[test]
    fn static_prefix_registered_first_wins_over_parametric() {
        let mut router = Router::new();
        router.add("GET", "/users/email/{email}", stub(), vec![]);
        router.add("GET", "/users/{id}", stub(), vec![]);

        let matched = router.match_request("GET", "/users/email/a@b.com").unwrap();
        assert_eq!(matched.params.get("email"), Some(&"a@b.com".to_string()));
    }

    #[test]
    fn no_match_fails_with_route_not_found() {
        let router = Router::new();
        assert!(matches!(router.match_request("GET", "/nope"), Err(RouterError::NotFound)));
    }

    #[test]
    fn wildcard_suffix_matches_any_tail() {
        let mut router = Router::new();
        router.add("POST", "/async-users*", stub(), vec![]);
        assert!(router.match_request("POST", "/async-users/bulk").is_ok());
        assert!(router.match_request("POST", "/async-users").is_ok());
    }

    #[test]
    fn lookup_does_not_require_invoking_handler() {
        let mut router = Router::new();
        router.add("GET", "/items/{id}", stub(), vec![]);
        let descriptor = router.lookup("GET", "/items/7").unwrap();
        assert_eq!(descriptor.path_template, "/items/{id}");
    }
}
