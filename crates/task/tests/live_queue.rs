///! Integration tests against a live Redis instance.
///! All tests are `#[ignore]` — run with `cargo test -- --ignored`.
///!
///! Requirements: REDIS_URL pointing at a reachable instance.
use runtime_common::config::PoolConfig;
use runtime_common::types::TaskEnvelope;
use runtime_pool::{KvConnector, KvPool};
use runtime_task::{TaskQueue, STREAM_DEFAULT};
use serde_json::json;

fn small_pool_config() -> PoolConfig {
    PoolConfig {
        min: 1,
        max: 3,
        idle_buffer: 0.3,
        margin: 0.1,
        acquire_timeout_ms: 1000,
    }
}

async fn live_queue() -> TaskQueue {
    let url = std::env::var("REDIS_URL").expect("REDIS_URL not set");
    let connector = KvConnector::new(&url).expect("client construction failed");
    let pool: KvPool = KvPool::new("task-queue-test", connector, &small_pool_config());
    pool.prewarm().await.expect("prewarm failed");
    let queue = TaskQueue::new(pool);
    queue.initialize().await.expect("initialize failed");
    queue
}

#[tokio::test]
#[ignore]
async fn dispatch_then_dequeue_roundtrips() {
    let queue = live_queue().await;
    let envelope = TaskEnvelope::new("Echo", vec![json!("hello")]);

    assert!(queue.dispatch(&envelope).await);

    let (entry_id, received) = queue
        .dequeue("test-consumer", Some(1000))
        .await
        .expect("dequeue failed")
        .expect("expected an entry");

    assert_eq!(received.class, "Echo");
    assert_eq!(received.arguments, envelope.arguments);

    queue.ack(&entry_id).await.expect("ack failed");
}

#[tokio::test]
#[ignore]
async fn unacked_entries_are_reclaimable() {
    let queue = live_queue().await;
    let envelope = TaskEnvelope::new("Echo", vec![json!(42)]);
    assert!(queue.dispatch(&envelope).await);

    let (_entry_id, _received) = queue
        .dequeue("consumer-a", Some(1000))
        .await
        .expect("dequeue failed")
        .expect("expected an entry");

    // Never acked by consumer-a: reclaimable immediately with a 0ms idle floor.
    let reclaimed = queue
        .reclaim_pending("consumer-b", 0)
        .await
        .expect("reclaim failed");

    assert!(reclaimed.iter().any(|(_, e)| e.class == "Echo"));

    for (entry_id, _) in reclaimed {
        queue.ack(&entry_id).await.expect("ack failed");
    }
}

#[tokio::test]
#[ignore]
async fn initialize_is_idempotent() {
    let queue = live_queue().await;
    queue.initialize().await.expect("second initialize failed");
    assert_eq!(STREAM_DEFAULT, "tasks:default");
}
