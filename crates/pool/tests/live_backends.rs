///! Integration tests against live Postgres/Redis.
///! All tests are `#[ignore]` — run with `cargo test -- --ignored`.
///!
///! Requirements: DATABASE_URL, REDIS_URL pointing at reachable instances.
use runtime_common::config::PoolConfig;
use runtime_pool::{KvConnector, KvPool, RdbConnector, RdbPool};

fn small_pool_config() -> PoolConfig {
    PoolConfig {
        min: 1,
        max: 3,
        idle_buffer: 0.3,
        margin: 0.1,
        acquire_timeout_ms: 1000,
    }
}

#[tokio::test]
#[ignore]
async fn rdb_pool_prewarms_and_probes() {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
    let pool: RdbPool = RdbPool::new("rdb-test", RdbConnector::new(url), &small_pool_config());
    pool.prewarm().await.expect("prewarm failed");

    let guard = pool.acquire().await.expect("acquire failed");
    drop(guard);

    let stats = pool.stats().await;
    assert_eq!(stats.created, 1);
}

#[tokio::test]
#[ignore]
async fn kv_pool_prewarms_and_probes() {
    let url = std::env::var("REDIS_URL").expect("REDIS_URL not set");
    let connector = KvConnector::new(&url).expect("client construction failed");
    let pool: KvPool = KvPool::new("kv-test", connector, &small_pool_config());
    pool.prewarm().await.expect("prewarm failed");

    let guard = pool.acquire().await.expect("acquire failed");
    drop(guard);

    let stats = pool.stats().await;
    assert_eq!(stats.created, 1);
}
