///! Integration tests against a live Postgres instance.
///! All tests are `#[ignore]` — run with `cargo test -- --ignored`.
///!
///! Requirements: DATABASE_URL pointing at a reachable instance with the
///! `users` table migrated.
use runtime_common::config::PoolConfig;
use runtime_common::pagination::PaginationQuery;
use runtime_common::types::UserInput;
use runtime_pool::{RdbConnector, RdbPool};
use runtime_repository::UserRepository;
use std::collections::HashMap;

fn small_pool_config() -> PoolConfig {
    PoolConfig {
        min: 1,
        max: 3,
        idle_buffer: 0.3,
        margin: 0.1,
        acquire_timeout_ms: 1000,
    }
}

async fn live_repo() -> UserRepository {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
    let pool: RdbPool = RdbPool::new("user-repo-test", RdbConnector::new(url), &small_pool_config());
    pool.prewarm().await.expect("prewarm failed");
    UserRepository::new(pool)
}

#[tokio::test]
#[ignore]
async fn create_find_update_delete_roundtrip() {
    let repo = live_repo().await;

    let created = repo
        .create(&UserInput { name: "Ada".to_string(), email: "ada@example.com".to_string() })
        .await
        .expect("create failed");

    let found = repo.find(created.id()).await.expect("find failed").expect("missing row");
    assert_eq!(found.email, "ada@example.com");

    let by_email = repo
        .find_by_column("email", "ada@example.com")
        .await
        .expect("find_by_column failed")
        .expect("missing row");
    assert_eq!(by_email.id, created.id);

    let updated = repo
        .update(
            created.id(),
            &UserInput { name: "Ada Lovelace".to_string(), email: "ada@example.com".to_string() },
        )
        .await
        .expect("update failed");
    assert!(updated);

    let deleted = repo.delete(created.id()).await.expect("delete failed");
    assert!(deleted);
}

#[tokio::test]
#[ignore]
async fn create_with_duplicate_email_is_integrity_violation_not_transport() {
    let repo = live_repo().await;

    let first = repo
        .create(&UserInput { name: "Grace".to_string(), email: "grace@example.com".to_string() })
        .await
        .expect("first create failed");

    let err = repo
        .create(&UserInput { name: "Grace Hopper".to_string(), email: "grace@example.com".to_string() })
        .await
        .expect_err("expected duplicate-key error");

    assert!(
        matches!(&err, runtime_repository::RepositoryError::Pool(runtime_pool::PoolError::Domain(_))),
        "expected PoolError::Domain, got {err:?}"
    );

    let runtime_error: runtime_common::RuntimeError = err.into();
    assert!(matches!(runtime_error, runtime_common::RuntimeError::IntegrityViolation(_)));

    repo.delete(first.id()).await.expect("cleanup delete failed");
}

#[tokio::test]
#[ignore]
async fn list_rejects_unknown_filter_field() {
    let repo = live_repo().await;
    let mut filters = HashMap::new();
    filters.insert("is_admin".to_string(), "true".to_string());

    let query = PaginationQuery {
        page: 1,
        limit: 10,
        offset: None,
        filters,
        sort_by: None,
        sort_direction: None,
    };

    let err = repo.list(&query).await.expect_err("expected InvalidFilter");
    assert!(matches!(err, runtime_repository::RepositoryError::InvalidFilter(_)));
}

#[tokio::test]
#[ignore]
async fn filtered_count_matches_pagination_total() {
    let repo = live_repo().await;
    let query = PaginationQuery {
        page: 1,
        limit: 10,
        offset: None,
        filters: HashMap::new(),
        sort_by: None,
        sort_direction: None,
    };

    let result = repo.list(&query).await.expect("list failed");
    let total = repo.filtered_count(&[]).await.expect("filtered_count failed");
    assert_eq!(result.meta.total, total);
}
