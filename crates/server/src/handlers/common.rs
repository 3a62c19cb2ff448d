use std::collections::HashMap;

use runtime_common::keying::ListQuery;
use runtime_common::pagination::PaginationQuery;
use runtime_common::RuntimeError;
use serde::de::DeserializeOwned;

const RESERVED_QUERY_KEYS: &[&str] = &["page", "limit", "offset", "sortBy", "sortDirection"];

/// Builds a `PaginationQuery` from the raw querystring map (§4.10, §6):
/// `page`/`limit`/`offset`/`sortBy`/`sortDirection` are recognized by name,
/// everything else becomes a filter.
pub fn parse_pagination(query: &HashMap<String, String>) -> PaginationQuery {
    let page = query.get("page").and_then(|v| v.parse().ok()).unwrap_or(1);
    let limit = query.get("limit").and_then(|v| v.parse().ok()).unwrap_or(20);
    let offset = query.get("offset").and_then(|v| v.parse().ok());
    let sort_by = query.get("sortBy").cloned();
    let sort_direction = query.get("sortDirection").cloned();
    let filters = query
        .iter()
        .filter(|(k, _)| !RESERVED_QUERY_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    PaginationQuery {
        page,
        limit,
        offset,
        filters,
        sort_by,
        sort_direction,
    }
}

/// The shape hashed into a list cache key, derived from the same bound
/// query a repository `list()` call uses, so a cache hit and a cache
/// population describe the same page (§4.9).
pub fn list_query_key(query: &PaginationQuery) -> ListQuery {
    let (limit, offset) = query.bind();
    ListQuery {
        limit,
        offset,
        filters_sorted: query.filters_sorted(),
        sort_by: query.sort_by.clone().unwrap_or_else(|| "created_at".to_string()),
        sort_dir: query.sort_dir().to_string(),
    }
}

pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, RuntimeError> {
    serde_json::from_slice(body).map_err(|e| RuntimeError::InvalidInput(format!("invalid request body: {e}")))
}

pub fn parse_id(params: &HashMap<String, String>, name: &str) -> Result<i64, RuntimeError> {
    params
        .get(name)
        .and_then(|v| v.parse::<i64>().ok())
        .ok_or_else(|| RuntimeError::InvalidInput(format!("invalid or missing path parameter: {name}")))
}

/// Extracts a trailing numeric id from a wildcard-routed path, e.g.
/// `/async-users/42` → `Some(42)` (§6 `/async-users*`'s tail carries the
/// target row for `PUT`/`DELETE`, since the wildcard route has no named
/// capture group).
pub fn extract_tail_id(path: &str, prefix: &str) -> Option<i64> {
    path.strip_prefix(prefix)?.trim_start_matches('/').parse().ok()
}
