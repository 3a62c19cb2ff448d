//! Pagination request/response shapes shared by every repository (§4.10, §6).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Inbound pagination + sort + filter query, as parsed from the querystring.
///
/// `offset`, when present, overrides `page * limit` — matching spec.md §6's
/// "`offset` (overrides page·limit if present)".
#[derive(Clone, Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    pub offset: Option<u32>,
    #[serde(default)]
    pub filters: HashMap<String, String>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

impl PaginationQuery {
    /// Resolve to a bound `(limit, offset)` pair: `limit` clamped to
    /// `[1,100]`, `offset` either the explicit override or `(page-1)*limit`
    /// with `page` floored at 1.
    pub fn bind(&self) -> (u32, u32) {
        let limit = self.limit.clamp(1, 100);
        let offset = match self.offset {
            Some(o) => o,
            None => self.page.max(1).saturating_sub(1).saturating_mul(limit),
        };
        (limit, offset)
    }

    /// Sort direction coerced to `ASC` or `DESC`, defaulting to `DESC` per
    /// spec.md §4.10's order-by builder.
    pub fn sort_dir(&self) -> &'static str {
        match self.sort_direction.as_deref().map(str::to_ascii_uppercase) {
            Some(ref s) if s == "ASC" => "ASC",
            _ => "DESC",
        }
    }

    /// Filters as a sorted `(field, value)` list, for deterministic cache
    /// key hashing via `keying::list_key`.
    pub fn filters_sorted(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .filters
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        pairs.sort();
        pairs
    }
}

/// Paginated result envelope: the page of records plus the summary spec.md
/// §4.10 names — `total = filtered_count(filters)`, the Open Question in
/// §9 that this spec resolves in favor of `filtered_count` everywhere.
#[derive(Clone, Debug, Serialize)]
pub struct PaginationResult<T> {
    pub records: Vec<T>,
    pub meta: PaginationMeta,
}

#[derive(Clone, Debug, Serialize)]
pub struct PaginationMeta {
    pub total: i64,
    pub count: usize,
    pub per_page: u32,
    pub current_page: u32,
    pub total_pages: u32,
}

impl PaginationMeta {
    pub fn new(total: i64, count: usize, per_page: u32, current_page: u32) -> Self {
        let total_pages = if per_page == 0 {
            0
        } else {
            ((total.max(0) as u64).div_ceil(per_page as u64)) as u32
        };
        Self {
            total,
            count,
            per_page,
            current_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_overrides_page_when_present() {
        let q = PaginationQuery {
            page: 3,
            limit: 10,
            offset: Some(5),
            filters: HashMap::new(),
            sort_by: None,
            sort_direction: None,
        };
        assert_eq!(q.bind(), (10, 5));
    }

    #[test]
    fn page_computes_offset_when_no_override() {
        let q = PaginationQuery {
            page: 3,
            limit: 10,
            offset: None,
            filters: HashMap::new(),
            sort_by: None,
            sort_direction: None,
        };
        assert_eq!(q.bind(), (10, 20));
    }

    #[test]
    fn limit_clamps_to_1_100() {
        let mut q = PaginationQuery {
            page: 1,
            limit: 500,
            offset: None,
            filters: HashMap::new(),
            sort_by: None,
            sort_direction: None,
        };
        assert_eq!(q.bind().0, 100);
        q.limit = 0;
        assert_eq!(q.bind().0, 1);
    }

    #[test]
    fn sort_dir_defaults_to_desc() {
        let q = PaginationQuery {
            page: 1,
            limit: 10,
            offset: None,
            filters: HashMap::new(),
            sort_by: None,
            sort_direction: None,
        };
        assert_eq!(q.sort_dir(), "DESC");
    }

    #[test]
    fn total_pages_rounds_up() {
        let meta = PaginationMeta::new(21, 10, 10, 1);
        assert_eq!(meta.total_pages, 3);
    }
}
