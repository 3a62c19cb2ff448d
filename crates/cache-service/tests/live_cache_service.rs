///! Integration tests against a live Redis instance.
///! All tests are `#[ignore]` — run with `cargo test -- --ignored`.
///!
///! Requirements: REDIS_URL pointing at a reachable instance.
use runtime_cache_service::CacheService;
use runtime_common::config::PoolConfig;
use runtime_common::keying::ListQuery;
use runtime_pool::{KvConnector, KvPool};

fn small_pool_config() -> PoolConfig {
    PoolConfig {
        min: 1,
        max: 3,
        idle_buffer: 0.3,
        margin: 0.1,
        acquire_timeout_ms: 1000,
    }
}

async fn live_service() -> CacheService {
    let url = std::env::var("REDIS_URL").expect("REDIS_URL not set");
    let connector = KvConnector::new(&url).expect("client construction failed");
    let pool: KvPool = KvPool::new("cache-service-test", connector, &small_pool_config());
    pool.prewarm().await.expect("prewarm failed");
    CacheService::new(pool)
}

fn query(filters: Vec<(&str, &str)>) -> ListQuery {
    ListQuery {
        limit: 10,
        offset: 0,
        filters_sorted: filters.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        sort_by: "id".to_string(),
        sort_dir: "ASC".to_string(),
    }
}

#[tokio::test]
#[ignore]
async fn record_round_trip_get_set_invalidate() {
    let svc = live_service().await;

    assert!(svc.get_record("users", "1").await.unwrap().is_none());

    svc.set_record("users", "1", b"{\"id\":1}").await.unwrap();
    let got = svc.get_record("users", "1").await.unwrap();
    assert_eq!(got.as_deref(), Some(&b"{\"id\":1}"[..]));

    svc.invalidate_record("users", "1").await.unwrap();
    assert!(svc.get_record("users", "1").await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn record_by_column_round_trip() {
    let svc = live_service().await;

    svc.set_record_by_column("users", "email", "ada@example.com", b"{\"id\":1}")
        .await
        .unwrap();
    let got = svc.get_record_by_column("users", "email", "ada@example.com").await.unwrap();
    assert_eq!(got.as_deref(), Some(&b"{\"id\":1}"[..]));

    svc.invalidate_record_by_column("users", "email", "ada@example.com").await.unwrap();
    assert!(svc
        .get_record_by_column("users", "email", "ada@example.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore]
async fn invalidate_lists_orphans_prior_tag_keys() {
    let svc = live_service().await;
    let q = query(vec![("status", "active")]);

    svc.set_list("items", &q, b"[1,2,3]").await.unwrap();
    let got = svc.get_list("items", &q).await.unwrap();
    assert_eq!(got.as_deref(), Some(&b"[1,2,3]"[..]));

    svc.invalidate_lists("items").await.unwrap();
    assert!(svc.get_list("items", &q).await.unwrap().is_none());

    // A fresh write under the bumped tag is readable again.
    svc.set_list("items", &q, b"[1,2,3,4]").await.unwrap();
    let got = svc.get_list("items", &q).await.unwrap();
    assert_eq!(got.as_deref(), Some(&b"[1,2,3,4]"[..]));
}
