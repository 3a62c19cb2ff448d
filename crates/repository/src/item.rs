use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, FromRow, Postgres, QueryBuilder, Row};

use runtime_common::ids::ItemId;
use runtime_common::pagination::{PaginationMeta, PaginationQuery, PaginationResult};
use runtime_common::types::{Item, ItemInput};
use runtime_pool::RdbPool;

use crate::error::RepositoryError;
use crate::query::{append_pagination, FilterKind, OrderByBuilder, WhereBuilder};

const FILTERS: &[(&str, FilterKind)] = &[
    ("sku", FilterKind::Exact),
    ("name", FilterKind::Like),
    ("created_at_after", FilterKind::CreatedAfter),
    ("created_at_before", FilterKind::CreatedBefore),
];

const SORT_COLUMNS: &[&str] = &["id", "sku", "name", "price_cents", "created_at", "updated_at"];

const WHERE_BUILDER: WhereBuilder = WhereBuilder::new(FILTERS);
const ORDER_BUILDER: OrderByBuilder = OrderByBuilder::new(SORT_COLUMNS, "created_at");

/// Postgres SQLSTATE for a unique-violation (duplicate SKU).
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

struct ItemRow {
    id: i64,
    sku: String,
    name: String,
    price_cents: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FromRow<'_, PgRow> for ItemRow {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            sku: row.try_get("sku")?,
            name: row.try_get("name")?,
            price_cents: row.try_get("price_cents")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Self {
            id: row.id,
            sku: row.sku,
            name: row.name,
            price_cents: row.price_cents,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// CRUD + pagination over the `items` table (§4.10, §3 data model).
#[derive(Clone)]
pub struct ItemRepository {
    rdb: RdbPool,
}

impl ItemRepository {
    pub fn new(rdb: RdbPool) -> Self {
        Self { rdb }
    }

    pub async fn create(&self, input: &ItemInput) -> Result<Item, RepositoryError> {
        let sku = input.sku.clone();
        let name = input.name.clone();
        let price_cents = input.price_cents;

        let row = self
            .rdb
            .with_connection(|conn| {
                Box::pin(async move {
                    sqlx::query_as::<_, ItemRow>(
                        r#"
                        INSERT INTO items (sku, name, price_cents, created_at, updated_at)
                        VALUES ($1, $2, $3, now(), now())
                        RETURNING id, sku, name, price_cents, created_at, updated_at
                        "#,
                    )
                    .bind(sku)
                    .bind(name)
                    .bind(price_cents)
                    .fetch_one(conn)
                    .await
                    .map_err(classify_write_error)
                })
            })
            .await?;

        Ok(row.into())
    }

    pub async fn find(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        let row = self
            .rdb
            .with_connection(|conn| {
                Box::pin(async move {
                    sqlx::query_as::<_, ItemRow>(
                        r#"
                        SELECT id, sku, name, price_cents, created_at, updated_at
                        FROM items WHERE id = $1
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

    /// `find_by_column(col, v)` (§4.10), restricted to the secondary lookup
    /// spec.md's HTTP surface exposes: `/items/sku/{sku}`.
    pub async fn find_by_column(&self, column: &str, value: &str) -> Result<Option<Item>, RepositoryError> {
        if column != "sku" {
            return Err(RepositoryError::InvalidColumn(column.to_string()));
        }
        let value = value.to_string();

        let row = self
            .rdb
            .with_connection(|conn| {
                Box::pin(async move {
                    sqlx::query_as::<_, ItemRow>(
                        r#"
                        SELECT id, sku, name, price_cents, created_at, updated_at
                        FROM items WHERE sku = $1
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

    pub async fn list(&self, query: &PaginationQuery) -> Result<PaginationResult<Item>, RepositoryError> {
        let (limit, offset) = query.bind();
        let filters = query.filters_sorted();

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, sku, name, price_cents, created_at, updated_at FROM items WHERE true",
        );
        WHERE_BUILDER.append(&mut qb, &filters)?;
        ORDER_BUILDER.append(&mut qb, query.sort_by.as_deref(), query.sort_dir())?;
        append_pagination(&mut qb, limit, offset);

        let records: Vec<Item> = self
            .rdb
            .with_connection(|conn| {
                Box::pin(async move {
                    qb.build_query_as::<ItemRow>()
                        .fetch_all(conn)
                        .await
                        .map(|rows| rows.into_iter().map(Into::into).collect::<Vec<Item>>())
                        .map_err(|e| runtime_pool::PoolError::Transport(e.to_string()))
                })
            })
            .await?;

        let total = self.filtered_count(&filters).await?;
        let meta = PaginationMeta::new(total, records.len(), limit, query.page.max(1));

        Ok(PaginationResult { records, meta })
    }

    pub async fn filtered_count(&self, filters: &[(String, String)]) -> Result<i64, RepositoryError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM items WHERE true");
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

    pub async fn update(&self, id: ItemId, input: &ItemInput) -> Result<bool, RepositoryError> {
        let sku = input.sku.clone();
        let name = input.name.clone();
        let price_cents = input.price_cents;

        let rows_affected = self
            .rdb
            .with_connection(|conn| {
                Box::pin(async move {
                    sqlx::query(
                        r#"
                        UPDATE items SET sku = $2, name = $3, price_cents = $4, updated_at = now()
                        WHERE id = $1
                        "#,
                    )
                    .bind(id.0)
                    .bind(sku)
                    .bind(name)
                    .bind(price_cents)
                    .execute(conn)
                    .await
                    .map(|r| r.rows_affected())
                    .map_err(classify_write_error)
                })
            })
            .await?;

        Ok(rows_affected > 0)
    }

    pub async fn delete(&self, id: ItemId) -> Result<bool, RepositoryError> {
        let rows_affected = self
            .rdb
            .with_connection(|conn| {
                Box::pin(async move {
                    sqlx::query("DELETE FROM items WHERE id = $1")
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
