use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, FromRow, Postgres, QueryBuilder, Row};

use runtime_common::ids::UserId;
use runtime_common::pagination::{PaginationMeta, PaginationQuery, PaginationResult};
use runtime_common::types::{User, UserInput};
use runtime_pool::RdbPool;

use crate::error::RepositoryError;
use crate::query::{append_pagination, FilterKind, OrderByBuilder, WhereBuilder};

const FILTERS: &[(&str, FilterKind)] = &[
    ("name", FilterKind::Like),
    ("email", FilterKind::Exact),
    ("created_at_after", FilterKind::CreatedAfter),
    ("created_at_before", FilterKind::CreatedBefore),
];

const SORT_COLUMNS: &[&str] = &["id", "name", "email", "created_at", "updated_at"];

const WHERE_BUILDER: WhereBuilder = WhereBuilder::new(FILTERS);
const ORDER_BUILDER: OrderByBuilder = OrderByBuilder::new(SORT_COLUMNS, "created_at");

/// Postgres SQLSTATE for a unique-violation (duplicate email).
const UNIQUE_VIOLATION: &str = "23505";

/// `create()`/`update()` treat duplicate-key as a domain error, not a
/// transport error (§4.1: "the *create* variant treats duplicate-key as a
/// domain error"), so a 409 reaches the client instead of a 503.
fn classify_write_error(e: sqlx::Error) -> runtime_pool::PoolError {
    let is_unique_violation = e
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION);

    if is_unique_violation {
        runtime_pool::PoolError::Domain(e.to_string())
    } else {
        runtime_pool::PoolError::Transport(e.to_string())
    }
}

struct UserRow {
    id: i64,
    name: String,
    email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FromRow<'_, PgRow> for UserRow {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// CRUD + pagination over the `users` table (§4.10, §3 data model).
#[derive(Clone)]
pub struct UserRepository {
    rdb: RdbPool,
}

impl UserRepository {
    pub fn new(rdb: RdbPool) -> Self {
        Self { rdb }
    }

    pub async fn create(&self, input: &UserInput) -> Result<User, RepositoryError> {
        let name = input.name.clone();
        let email = input.email.clone();

        let row = self
            .rdb
            .with_connection(|conn| {
                Box::pin(async move {
                    sqlx::query_as::<_, UserRow>(
                        r#"
                        INSERT INTO users (name, email, created_at, updated_at)
                        VALUES ($1, $2, now(), now())
                        RETURNING id, name, email, created_at, updated_at
                        "#,
                    )
                    .bind(name)
                    .bind(email)
                    .fetch_one(conn)
                    .await
                    .map_err(classify_write_error)
                })
            })
            .await?;

        Ok(row.into())
    }

    pub async fn find(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = self
            .rdb
            .with_connection(|conn| {
                Box::pin(async move {
                    sqlx::query_as::<_, UserRow>(
                        r#"
                        SELECT id, name, email, created_at, updated_at
                        FROM users WHERE id = $1
                        "#,
                    )
                    .bind(id.0)
                    .fetch_optional(conn)
                    .await
                    .map_err(|e| runtime_pool::PoolError::Transport(e.to_string()))
                })
            })
            .await?;

        Ok(row.map(Into::into))
    }

    /// `find_by_column(col, v)` (§4.10), restricted to the one secondary
    /// lookup spec.md's HTTP surface exposes: `/users/email/{email}`.
    pub async fn find_by_column(&self, column: &str, value: &str) -> Result<Option<User>, RepositoryError> {
        if column != "email" {
            return Err(RepositoryError::InvalidColumn(column.to_string()));
        }
        let value = value.to_string();

        let row = self
            .rdb
            .with_connection(|conn| {
                Box::pin(async move {
                    sqlx::query_as::<_, UserRow>(
                        r#"
                        SELECT id, name, email, created_at, updated_at
                        FROM users WHERE email = $1
                        "#,
                    )
                    .bind(value)
                    .fetch_optional(conn)
                    .await
                    .map_err(|e| runtime_pool::PoolError::Transport(e.to_string()))
                })
            })
            .await?;

        Ok(row.map(Into::into))
    }

    pub async fn list(&self, query: &PaginationQuery) -> Result<PaginationResult<User>, RepositoryError> {
        let (limit, offset) = query.bind();
        let filters = query.filters_sorted();

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, name, email, created_at, updated_at FROM users WHERE true",
        );
        WHERE_BUILDER.append(&mut qb, &filters)?;
        ORDER_BUILDER.append(&mut qb, query.sort_by.as_deref(), query.sort_dir())?;
        append_pagination(&mut qb, limit, offset);

        let records: Vec<User> = self
            .rdb
            .with_connection(|conn| {
                Box::pin(async move {
                    qb.build_query_as::<UserRow>()
                        .fetch_all(conn)
                        .await
                        .map(|rows| rows.into_iter().map(Into::into).collect::<Vec<User>>())
                        .map_err(|e| runtime_pool::PoolError::Transport(e.to_string()))
                })
            })
            .await?;

        let total = self.filtered_count(&filters).await?;
        let meta = PaginationMeta::new(total, records.len(), limit, query.page.max(1));

        Ok(PaginationResult { records, meta })
    }

    pub async fn filtered_count(&self, filters: &[(String, String)]) -> Result<i64, RepositoryError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM users WHERE true");
        WHERE_BUILDER.append(&mut qb, filters)?;

        let (count,): (i64,) = self
            .rdb
            .with_connection(|conn| {
                Box::pin(async move {
                    qb.build_query_as::<(i64,)>()
                        .fetch_one(conn)
                        .await
                        .map_err(|e| runtime_pool::PoolError::Transport(e.to_string()))
                })
            })
            .await?;

        Ok(count)
    }

    pub async fn count(&self) -> Result<i64, RepositoryError> {
        self.filtered_count(&[]).await
    }

    pub async fn update(&self, id: UserId, input: &UserInput) -> Result<bool, RepositoryError> {
        let name = input.name.clone();
        let email = input.email.clone();

        let rows_affected = self
            .rdb
            .with_connection(|conn| {
                Box::pin(async move {
                    sqlx::query(
                        r#"
                        UPDATE users SET name = $2, email = $3, updated_at = now()
                        WHERE id = $1
                        "#,
                    )
                    .bind(id.0)
                    .bind(name)
                    .bind(email)
                    .execute(conn)
                    .await
                    .map(|r| r.rows_affected())
                    .map_err(classify_write_error)
                })
            })
            .await?;

        Ok(rows_affected > 0)
    }

    pub async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let rows_affected = self
            .rdb
            .with_connection(|conn| {
                Box::pin(async move {
                    sqlx::query("DELETE FROM users WHERE id = $1")
                        .bind(id.0)
                        .execute(conn)
                        .await
                        .map(|r| r.rows_affected())
                        .map_err(|e| runtime_pool::PoolError::Transport(e.to_string()))
                })
            })
            .await?;

        Ok(rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_allowlist_matches_sort_allowlist_columns() {
        for (field, _) in FILTERS {
            assert!(!field.is_empty());
        }
        assert!(SORT_COLUMNS.contains(&"created_at"));
    }
}
