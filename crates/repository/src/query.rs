//! Where/order-by/pagination helpers shared by every repository (§4.10).

use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use crate::error::RepositoryError;

/// The predicate kind a filterable column is bound to. Covers the four
/// shapes spec.md names: exact match, substring `LIKE`, and the two
/// `created_at` comparisons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    Exact,
    Like,
    CreatedAfter,
    CreatedBefore,
}

/// Field allowlist: unknown fields fail closed with `InvalidFilter` rather
/// than being silently ignored or interpolated into SQL.
pub struct WhereBuilder {
    allowlist: &'static [(&'static str, FilterKind)],
}

impl WhereBuilder {
    pub const fn new(allowlist: &'static [(&'static str, FilterKind)]) -> Self {
        Self { allowlist }
    }

    /// Append `AND field <op> $n` for each filter, in iteration order.
    pub fn append(
        &self,
        qb: &mut QueryBuilder<'_, Postgres>,
        filters: &[(String, String)],
    ) -> Result<(), RepositoryError> {
        for (field, value) in filters {
            let kind = self
                .allowlist
                .iter()
                .find(|(f, _)| f == field)
                .map(|(_, k)| *k)
                .ok_or_else(|| RepositoryError::InvalidFilter(field.clone()))?;

            qb.push(" AND ");
            match kind {
                FilterKind::Exact => {
                    qb.push(format!("{field} = "));
                    qb.push_bind(value.clone());
                }
                FilterKind::Like => {
                    qb.push(format!("{field} LIKE "));
                    qb.push_bind(format!("%{value}%"));
                }
                FilterKind::CreatedAfter => {
                    qb.push(format!("{field} > "));
                    qb.push_bind(parse_timestamp(field, value)?);
                }
                FilterKind::CreatedBefore => {
                    qb.push(format!("{field} < "));
                    qb.push_bind(parse_timestamp(field, value)?);
                }
            }
        }
        Ok(())
    }
}

fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| RepositoryError::InvalidValue(format!("{field}: expected RFC3339 timestamp")))
}

/// Column allowlist for `ORDER BY`; directions coerce to `ASC`/`DESC`, `DESC` default.
pub struct OrderByBuilder {
    allowlist: &'static [&'static str],
    default_column: &'static str,
}

impl OrderByBuilder {
    pub const fn new(allowlist: &'static [&'static str], default_column: &'static str) -> Self {
        Self { allowlist, default_column }
    }

    pub fn append(
        &self,
        qb: &mut QueryBuilder<'_, Postgres>,
        sort_by: Option<&str>,
        sort_dir: &str,
    ) -> Result<(), RepositoryError> {
        let column = match sort_by {
            Some(c) if self.allowlist.contains(&c) => c,
            Some(c) => return Err(RepositoryError::InvalidColumn(c.to_string())),
            None => self.default_column,
        };
        let dir = if sort_dir.eq_ignore_ascii_case("ASC") { "ASC" } else { "DESC" };
        qb.push(format!(" ORDER BY {column} {dir}"));
        Ok(())
    }
}

/// Bind `LIMIT`/`OFFSET` as integers — caller has already clamped
/// `limit` to `[1,100]` via `PaginationQuery::bind` (§4.10).
pub fn append_pagination(qb: &mut QueryBuilder<'_, Postgres>, limit: u32, offset: u32) {
    qb.push(" LIMIT ").push_bind(limit as i64);
    qb.push(" OFFSET ").push_bind(offset as i64);
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_FILTERS: &[(&str, FilterKind)] = &[
        ("name", FilterKind::Like),
        ("email", FilterKind::Exact),
        ("created_at_after", FilterKind::CreatedAfter),
    ];

    #[test]
    fn unknown_filter_field_is_rejected() {
        let builder = WhereBuilder::new(USER_FILTERS);
        let mut qb = QueryBuilder::new("SELECT 1 WHERE true");
        let filters = vec![("admin".to_string(), "true".to_string())];
        assert!(matches!(
            builder.append(&mut qb, &filters),
            Err(RepositoryError::InvalidFilter(_))
        ));
    }

    #[test]
    fn known_filter_appends_predicate() {
        let builder = WhereBuilder::new(USER_FILTERS);
        let mut qb = QueryBuilder::new("SELECT 1 WHERE true");
        let filters = vec![("email".to_string(), "a@b.com".to_string())];
        assert!(builder.append(&mut qb, &filters).is_ok());
        assert!(qb.sql().contains("email ="));
    }

    #[test]
    fn bad_timestamp_filter_is_rejected() {
        let builder = WhereBuilder::new(USER_FILTERS);
        let mut qb = QueryBuilder::new("SELECT 1 WHERE true");
        let filters = vec![("created_at_after".to_string(), "not-a-date".to_string())];
        assert!(matches!(
            builder.append(&mut qb, &filters),
            Err(RepositoryError::InvalidValue(_))
        ));
    }

    #[test]
    fn order_by_rejects_unknown_column() {
        let builder = OrderByBuilder::new(&["id", "created_at"], "id");
        let mut qb = QueryBuilder::new("SELECT 1");
        assert!(matches!(
            builder.append(&mut qb, Some("password"), "DESC"),
            Err(RepositoryError::InvalidColumn(_))
        ));
    }

    #[test]
    fn order_by_defaults_direction_to_desc() {
        let builder = OrderByBuilder::new(&["id"], "id");
        let mut qb = QueryBuilder::new("SELECT 1");
        builder.append(&mut qb, Some("id"), "sideways").unwrap();
        assert!(qb.sql().ends_with("ORDER BY id DESC"));
    }
}
