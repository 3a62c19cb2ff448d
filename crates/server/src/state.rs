//! Per-worker runtime wiring (§4.5, §5): each worker owns its own RDB/KV
//! pools, DI container, channel queue, and route table; the heartbeat table
//! and the shared cache table are the only state every worker has a handle
//! into in common. `AppState` round-robins incoming requests across the
//! pool of workers — the closest fit for "N tokio tasks standing in for N
//! worker processes sharing one listener" (§5).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;
use runtime_cache_service::CacheService;
use runtime_cache_table::CacheTable;
use runtime_common::RuntimeError;
use runtime_http::{global_chain, Container, Pipeline, RateLimitMiddleware, Router};
use runtime_pool::{KvConnector, KvPool, RdbConnector, RdbPool};
use runtime_repository::{ItemRepository, UserRepository};
use runtime_task::{HandlerRegistry, TaskQueue};
use runtime_worker::{HeartbeatTable, Worker, WorkerReady};

use crate::config::RuntimeConfig;
use crate::handlers::{self, HealthSource};
use crate::tasks;

/// One worker's fully-wired request-serving surface.
pub struct WorkerRuntime {
    pub worker: Worker,
    pub container: Container,
    pub router: Router,
    pub global_pipeline: Pipeline,
    pub task_queue: Arc<TaskQueue>,
}

/// Top-level application state shared by the axum fallback service.
pub struct AppState {
    pub config: RuntimeConfig,
    pub workers: Vec<Arc<WorkerRuntime>>,
    pub heartbeat: HeartbeatTable,
    pub cache_table: Arc<CacheTable>,
    pub metrics_handle: PrometheusHandle,
    pub start_ts: i64,
    next_worker: AtomicUsize,
}

impl AppState {
    /// Build every worker (pools pre-warmed, container bound, routes
    /// registered) up front, matching "pre-warm fails loudly at startup"
    /// (§4.1) rather than lazily on first request.
    pub async fn build(config: RuntimeConfig, metrics_handle: PrometheusHandle) -> Result<Arc<Self>, RuntimeError> {
        let heartbeat = HeartbeatTable::new();
        let cache_table = Arc::new(CacheTable::new(config.system.cache_table.max_entries));

        let start_ts = chrono::Utc::now().timestamp();

        let mut workers = Vec::with_capacity(config.system.server.workers as usize);
        for worker_id in 0..config.system.server.workers {
            let runtime = build_worker(
                worker_id,
                &config,
                heartbeat.clone(),
                Arc::clone(&cache_table),
                metrics_handle.clone(),
                start_ts,
            )
            .await?;
            workers.push(Arc::new(runtime));
        }

        Ok(Arc::new(Self {
            config,
            workers,
            heartbeat,
            cache_table,
            metrics_handle,
            start_ts,
            next_worker: AtomicUsize::new(0),
        }))
    }

    /// Round-robin the next worker to serve this request (§5: requests are
    /// distributed across the worker pool, no per-request affinity).
    pub fn pick_worker(&self) -> &Arc<WorkerRuntime> {
        let i = self.next_worker.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        &self.workers[i]
    }

    pub fn uptime(&self) -> i64 {
        (chrono::Utc::now().timestamp() - self.start_ts).max(0)
    }
}

async fn build_worker(
    worker_id: u32,
    config: &RuntimeConfig,
    heartbeat: HeartbeatTable,
    cache_table: Arc<CacheTable>,
    metrics_handle: PrometheusHandle,
    start_ts: i64,
) -> Result<WorkerRuntime, RuntimeError> {
    let cache_table_for_tasks = Arc::clone(&cache_table);
    let cache_table_for_health = Arc::clone(&cache_table);
    let heartbeat_for_health = heartbeat.clone();

    let rdb = RdbPool::new(
        "rdb",
        RdbConnector::new(config.database_url.clone()),
        &config.system.rdb_pool,
    );
    rdb.prewarm().await.map_err(RuntimeError::from)?;

    let kv_connector = KvConnector::new(&config.redis_url).map_err(RuntimeError::from)?;
    let kv = KvPool::new("kv", kv_connector, &config.system.kv_pool);
    kv.prewarm().await.map_err(RuntimeError::from)?;

    let task_queue = Arc::new(TaskQueue::new(kv.clone()));
    task_queue.initialize().await.map_err(RuntimeError::from)?;

    // Bound once at worker-start, not resolved per request (§4.4: "the
    // container is consulted once, when the route table is built").
    let container = Container::new();
    container.singleton::<UserRepository, _>({
        let rdb = rdb.clone();
        move |_| UserRepository::new(rdb.clone())
    });
    container.singleton::<ItemRepository, _>({
        let rdb = rdb.clone();
        move |_| ItemRepository::new(rdb.clone())
    });
    container.singleton::<CacheService, _>({
        let kv = kv.clone();
        move |_| CacheService::new(kv.clone())
    });

    let user_repo = container.get::<UserRepository>().map_err(RuntimeError::from)?;
    let item_repo = container.get::<ItemRepository>().map_err(RuntimeError::from)?;
    let cache_service = container.get::<CacheService>().map_err(RuntimeError::from)?;

    let mut registry = HandlerRegistry::new();
    tasks::register_all(
        &mut registry,
        Arc::clone(&user_repo),
        Arc::clone(&cache_service),
        cache_table_for_tasks,
    );

    let ready = WorkerReady::new();
    let worker = Worker::start(
        worker_id,
        rdb,
        kv,
        cache_table,
        heartbeat,
        ready,
        registry,
        config.system.task.channel_capacity,
        Arc::clone(&task_queue),
        config.system.task.cross_worker_pool_size,
    )
    .await?;

    let health_source = Arc::new(HealthSource {
        heartbeat: heartbeat_for_health,
        cache_table: cache_table_for_health,
        host: config.system.server.host.clone(),
        port: config.system.server.port,
        start_ts,
    });

    let router = handlers::build_router(
        Arc::clone(&user_repo),
        Arc::clone(&item_repo),
        Arc::clone(&cache_service),
        Arc::clone(worker.channel()),
        health_source,
        metrics_handle,
        config.debug,
    );

    let rate_limit = Arc::new(RateLimitMiddleware::new(
        config.system.server.rate_limit_per_minute,
        Duration::from_secs(60),
    ));
    let global_pipeline = Pipeline::new(global_chain(rate_limit));

    Ok(WorkerRuntime {
        worker,
        container,
        router,
        global_pipeline,
        task_queue,
    })
}
