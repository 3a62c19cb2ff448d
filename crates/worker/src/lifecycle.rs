use std::sync::Arc;
use std::time::Duration;

use runtime_cache_table::CacheTable;
use runtime_common::RuntimeError;
use runtime_pool::{KvPool, RdbPool};
use runtime_task::{ChannelQueue, HandlerRegistry, QueueConsumer, TaskQueue};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::heartbeat::HeartbeatTable;
use crate::ready::WorkerReady;

const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// One worker's owned runtime: its RDB pool, KV pool, in-process channel
/// queue, and a handle into the cross-worker shared heartbeat/cache tables
/// (§2 "each worker owns its own pools and caches; cross-worker state
/// exists only in the shared heartbeat table and the key-value store", §5).
pub struct Worker {
    pub worker_id: u32,
    pid: u32,
    rdb: RdbPool,
    kv: KvPool,
    cache_table: Arc<CacheTable>,
    heartbeat: HeartbeatTable,
    ready: WorkerReady,
    channel: Arc<ChannelQueue>,
    queue_consumers: Mutex<Vec<QueueConsumer>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    /// §4.5 worker start:
    /// 1. write the initial heartbeat row (abort on failure — infallible here),
    /// 2. mark `worker_ready`,
    /// 3. start the in-process channel consumer and `cross_worker_pool_size`
    ///    cross-worker queue consumers (each a distinct consumer name within
    ///    the shared consumer group, so pending-entry reclaim can tell them
    ///    apart),
    /// 4. start the 5s ticker (heartbeat + autoscale + cache GC).
    #[allow(clippy::too_many_arguments)]
    pub async fn start(
        worker_id: u32,
        rdb: RdbPool,
        kv: KvPool,
        cache_table: Arc<CacheTable>,
        heartbeat: HeartbeatTable,
        ready: WorkerReady,
        handlers: HandlerRegistry,
        channel_capacity: usize,
        task_queue: Arc<TaskQueue>,
        cross_worker_pool_size: u32,
    ) -> Result<Self, RuntimeError> {
        let pid = std::process::id();

        heartbeat.insert(worker_id, pid).await;
        ready.set(true);

        let registry = Arc::new(handlers);
        let channel = Arc::new(ChannelQueue::start(channel_capacity, Arc::clone(&registry)));

        let queue_consumers = (0..cross_worker_pool_size.max(1))
            .map(|i| {
                QueueConsumer::start(
                    Arc::clone(&task_queue),
                    Arc::clone(&registry),
                    format!("worker-{worker_id}-{i}"),
                )
            })
            .collect();

        let ticker = spawn_ticker(worker_id, rdb.clone(), kv.clone(), Arc::clone(&cache_table), heartbeat.clone());

        tracing::info!(worker_id, pid, cross_worker_pool_size, "worker started");

        Ok(Self {
            worker_id,
            pid,
            rdb,
            kv,
            cache_table,
            heartbeat,
            ready,
            channel,
            queue_consumers: Mutex::new(queue_consumers),
            ticker: Mutex::new(Some(ticker)),
        })
    }

    pub fn rdb(&self) -> &RdbPool {
        &self.rdb
    }

    pub fn kv(&self) -> &KvPool {
        &self.kv
    }

    pub fn cache_table(&self) -> &Arc<CacheTable> {
        &self.cache_table
    }

    pub fn channel(&self) -> &Arc<ChannelQueue> {
        &self.channel
    }

    pub fn ready(&self) -> &WorkerReady {
        &self.ready
    }

    /// §4.5 worker stop/exit/error: clear `worker_ready`, cancel the
    /// ticker, drain and stop the channel consumer and every cross-worker
    /// queue consumer, delete the worker row.
    pub async fn stop(&self) {
        self.ready.set(false);

        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }

        self.channel.stop().await;
        for consumer in self.queue_consumers.lock().await.drain(..) {
            consumer.stop().await;
        }
        self.heartbeat.remove(self.worker_id).await;

        tracing::info!(worker_id = self.worker_id, pid = self.pid, "worker stopped");
    }
}

fn spawn_ticker(
    worker_id: u32,
    rdb: RdbPool,
    kv: KvPool,
    cache_table: Arc<CacheTable>,
    heartbeat: HeartbeatTable,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        loop {
            interval.tick().await;

            let rdb_stats = rdb.stats().await;
            let kv_stats = kv.stats().await;
            heartbeat.touch(worker_id, rdb_stats, kv_stats).await;

            rdb.autoscale().await;
            kv.autoscale().await;
            cache_table.gc().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // `Worker::start` takes the concrete `RdbPool`/`KvPool` connector types,
    // which need a live Postgres/Redis to pre-warm — exercised by the
    // `#[ignore]`-gated integration suite in `tests/`. This unit test covers
    // the heartbeat/ready wiring `Worker::start`/`stop` drive directly.
    #[tokio::test]
    async fn heartbeat_and_ready_flag_follow_start_stop_lifecycle() {
        let heartbeat = HeartbeatTable::new();
        let ready = WorkerReady::new();

        heartbeat.insert(1, 1234).await;
        ready.set(true);

        assert!(ready.is_ready());
        assert_eq!(heartbeat.snapshot().await.len(), 1);

        ready.set(false);
        heartbeat.remove(1).await;
        assert!(!ready.is_ready());
        assert!(heartbeat.snapshot().await.is_empty());
    }
}
