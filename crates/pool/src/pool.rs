use std::collections::VecDeque;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use runtime_common::config::PoolConfig;
use runtime_common::types::PoolStats;
use tokio::sync::{Mutex, Notify};
use tokio::time::timeout;

use crate::circuit_breaker::CircuitBreaker;
use crate::error::PoolError;

/// A boxed, borrow-carrying future — the return type `with_connection`/
/// `with_connection_and_retry` closures use so they can capture the leased
/// handle reference for the duration of one scoped call.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Backend-specific connect/probe behavior a `Pool` is generic over.
/// `RdbConnector` and `KvConnector` are the two instantiations spec.md §4.1
/// asks for (one per backend), sharing every scaling/retry/health rule.
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    type Handle: Send;

    async fn connect(&self) -> Result<Self::Handle, PoolError>;

    /// Liveness probe — `SELECT 1` for RDB, `PING` for KV (§4.1 acquire()).
    async fn probe(&self, handle: &mut Self::Handle) -> bool;

    /// Classify a transport failure as retryable (connection refused, DNS
    /// failure, server-gone-away, transient timeout) or not (auth, bad
    /// syntax) — only retryable failures drive `with_connection_and_retry`'s
    /// reacquire loop (§4.1).
    fn classify(&self, _transport_failed: bool) -> bool {
        true
    }
}

struct Inner<C: Connector> {
    name: String,
    connector: C,
    min: u32,
    max: u32,
    idle_buffer: f64,
    margin: f64,
    acquire_timeout: Duration,
    idle: Mutex<VecDeque<C::Handle>>,
    created: AtomicU32,
    ready: AtomicBool,
    notify: Notify,
    circuit: CircuitBreaker,
}

/// An elastic, health-probed connection pool (§4.1).
///
/// `Pool<RdbConnector>` and `Pool<KvConnector>` are the two worker-local
/// pools spec.md's runtime core fronts every repository/cache-service call
/// through.
pub struct Pool<C: Connector> {
    inner: Arc<Inner<C>>,
}

impl<C: Connector> Clone for Pool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connector> Pool<C> {
    pub fn new(name: impl Into<String>, connector: C, config: &PoolConfig) -> Self {
        let name = name.into();
        Self {
            inner: Arc::new(Inner {
                circuit: CircuitBreaker::new(&name, 5, 60),
                name,
                connector,
                min: config.min,
                max: config.max,
                idle_buffer: config.idle_buffer,
                margin: config.margin,
                acquire_timeout: Duration::from_millis(config.acquire_timeout_ms),
                idle: Mutex::new(VecDeque::with_capacity(config.max as usize)),
                created: AtomicU32::new(0),
                ready: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Create exactly `min` handles in parallel at startup (§4.1 pre-warm).
    /// Until this completes, every `acquire` fails fast with `PoolNotReady`.
    pub async fn prewarm(&self) -> Result<(), PoolError> {
        let inner = &self.inner;
        let attempts = futures_join_all(inner.min, || inner.connector.connect()).await;

        let mut handles = Vec::with_capacity(inner.min as usize);
        for attempt in attempts {
            handles.push(attempt?);
        }

        {
            let mut idle = inner.idle.lock().await;
            for h in handles {
                idle.push_back(h);
            }
        }
        inner.created.store(inner.min, Ordering::SeqCst);
        inner.ready.store(true, Ordering::SeqCst);
        inner.notify.notify_waiters();

        tracing::info!(pool = %inner.name, min = inner.min, "pool pre-warmed");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    /// Lend a handle, blocking up to the configured acquire timeout.
    /// Creates a new handle synchronously (never more than one per acquire)
    /// if the idle queue is empty and `created < max`. Probes liveness
    /// before returning; on probe failure, replaces the handle in place
    /// (at most once per acquire) so `created` is unchanged.
    pub async fn acquire(&self) -> Result<PooledHandle<C>, PoolError> {
        let inner = &self.inner;

        if !inner.ready.load(Ordering::SeqCst) {
            return Err(PoolError::NotReady);
        }

        let deadline = Instant::now() + inner.acquire_timeout;
        let mut handle = loop {
            if let Some(h) = inner.idle.lock().await.pop_front() {
                break h;
            }

            if inner.created.load(Ordering::SeqCst) < inner.max {
                match self.try_create_one().await {
                    Ok(h) => break h,
                    Err(e) => {
                        inner.circuit.record_failure();
                        if !inner.connector.classify(true) {
                            return Err(e);
                        }
                    }
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(PoolError::Exhausted(inner.acquire_timeout));
            }

            if timeout(remaining, inner.notify.notified()).await.is_err() {
                return Err(PoolError::Exhausted(inner.acquire_timeout));
            }
        };

        if !inner.connector.probe(&mut handle).await {
            tracing::debug!(pool = %inner.name, "replacing unhealthy handle");
            drop(handle);
            handle = match inner.connector.connect().await {
                Ok(h) => h,
                Err(e) => {
                    inner.created.fetch_sub(1, Ordering::SeqCst);
                    return Err(e);
                }
            };
        } else {
            inner.circuit.record_success();
        }

        Ok(PooledHandle {
            pool: self.clone(),
            handle: Some(handle),
        })
    }

    async fn try_create_one(&self) -> Result<C::Handle, PoolError> {
        let inner = &self.inner;
        // Reserve a slot before connecting so concurrent acquires can't both
        // observe `created < max` and overshoot it.
        let reserved = inner
            .created
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| {
                if c < inner.max {
                    Some(c + 1)
                } else {
                    None
                }
            });
        if reserved.is_err() {
            return Err(PoolError::Exhausted(Duration::ZERO));
        }

        match inner.connector.connect().await {
            Ok(h) => Ok(h),
            Err(e) => {
                inner.created.fetch_sub(1, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    fn release(&self, handle: C::Handle) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let mut idle = inner.idle.lock().await;
            if idle.len() < inner.max as usize {
                idle.push_back(handle);
                drop(idle);
                inner.notify.notify_one();
            } else {
                drop(idle);
                drop(handle);
                inner.created.fetch_sub(1, Ordering::SeqCst);
            }
        });
    }

    fn close_one(&self, handle: C::Handle) {
        drop(handle);
        self.inner.created.fetch_sub(1, Ordering::SeqCst);
    }

    /// Run one scoped unit of work with a leased handle, releasing on every
    /// exit path (§4.1 `with_connection`). The closure returns a boxed
    /// future (rather than a bare `impl Future`) so it can borrow the
    /// handle reference across the `async move` block — a plain generic
    /// `Fut` can't express that borrow for a closure called more than once
    /// with a fresh lifetime each time.
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T, PoolError>
    where
        F: for<'c> FnOnce(&'c mut C::Handle) -> BoxFuture<'c, Result<T, PoolError>>,
    {
        let mut guard = self.acquire().await?;
        f(&mut guard).await
    }

    /// Scoped unit of work with retry/backoff for retryable transport
    /// failures: close the handle, decrement, reacquire, retry up to 3
    /// attempts total with `100·2^n` ms backoff (§4.1).
    pub async fn with_connection_and_retry<F, T>(&self, mut f: F) -> Result<T, PoolError>
    where
        F: for<'c> FnMut(&'c mut C::Handle) -> BoxFuture<'c, Result<T, PoolError>>,
    {
        const MAX_ATTEMPTS: u32 = 3;
        let mut attempt = 0;

        loop {
            let mut guard = self.acquire().await?;
            match f(&mut guard).await {
                Ok(v) => {
                    self.inner.circuit.record_success();
                    return Ok(v);
                }
                Err(e) if e.is_retryable() && attempt + 1 < MAX_ATTEMPTS => {
                    attempt += 1;
                    self.inner.circuit.record_failure();
                    guard.poison();
                    drop(guard);
                    let backoff = Duration::from_millis(100 * 2u64.pow(attempt));
                    tracing::warn!(
                        pool = %self.inner.name,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "retrying after transport error"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    self.inner.circuit.record_failure();
                    return Err(e);
                }
            }
        }
    }

    /// Current pool stats: `{capacity, available, created, in_use}` (§4.1 `stats()`).
    pub async fn stats(&self) -> PoolStats {
        let inner = &self.inner;
        let available = inner.idle.lock().await.len() as u32;
        let created = inner.created.load(Ordering::SeqCst);
        PoolStats {
            capacity: inner.max,
            available,
            created,
            in_use: created.saturating_sub(available),
        }
    }

    /// Adapt pool size to load (§4.1 `autoscale()`), called by the
    /// per-worker ticker (§4.5).
    pub async fn autoscale(&self) {
        let inner = &self.inner;
        if !inner.ready.load(Ordering::SeqCst) {
            return;
        }

        let available = inner.idle.lock().await.len() as u32;
        let created = inner.created.load(Ordering::SeqCst);
        let idle_target = (inner.max as f64 * inner.idle_buffer).round() as u32;

        let lower = (idle_target as f64 * (1.0 - inner.margin)).floor() as u32;
        let upper = (idle_target as f64 * (1.0 + inner.margin)).ceil() as u32;

        if available < lower && created < inner.max {
            let to_create = (inner.max - created).min(idle_target.saturating_sub(available));
            for _ in 0..to_create {
                match self.try_create_one().await {
                    Ok(h) => self.release(h),
                    Err(e) => {
                        tracing::warn!(pool = %inner.name, error = %e, "autoscale-up connect failed");
                        break;
                    }
                }
            }
            if to_create > 0 {
                tracing::debug!(pool = %inner.name, to_create, "autoscaled up");
            }
        } else if available > upper && created > inner.min {
            let to_close = (created - inner.min).min(available.saturating_sub(idle_target));
            let mut closed = 0;
            for _ in 0..to_close {
                let popped = inner.idle.lock().await.pop_front();
                match popped {
                    Some(h) => {
                        self.close_one(h);
                        closed += 1;
                    }
                    None => break,
                }
            }
            if closed > 0 {
                tracing::debug!(pool = %inner.name, closed, "autoscaled down");
            }
        }

        metrics::gauge!("pool.created", "pool" => inner.name.clone())
            .set(inner.created.load(Ordering::SeqCst) as f64);
        inner.circuit.report_metric();
    }
}

/// Run `n` connects concurrently without pulling in `futures::future::join_all`
/// for a single call site — the pre-warm phase is the only place the pool
/// needs to fan out connects in parallel.
async fn futures_join_all<C, F, Fut>(n: u32, mut make: F) -> Vec<Result<C, PoolError>>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<C, PoolError>>,
{
    let mut tasks = Vec::with_capacity(n as usize);
    for _ in 0..n {
        tasks.push(make());
    }
    let mut results = Vec::with_capacity(n as usize);
    for t in tasks {
        results.push(t.await);
    }
    results
}

/// A leased handle, released back to the pool (or closed, if poisoned) on
/// drop — the scope guard DESIGN NOTES §9 asks for in place of a coroutine
/// `defer`.
pub struct PooledHandle<C: Connector> {
    pool: Pool<C>,
    handle: Option<C::Handle>,
}

impl<C: Connector> PooledHandle<C> {
    /// Mark this handle to be closed rather than returned to the pool —
    /// used after a retryable transport failure so a known-bad handle isn't
    /// recycled (§4.1 retry: "close handle, decrement, reacquire").
    pub fn poison(&mut self) {
        if let Some(h) = self.handle.take() {
            self.pool.close_one(h);
        }
    }
}

impl<C: Connector> Deref for PooledHandle<C> {
    type Target = C::Handle;
    fn deref(&self) -> &Self::Target {
        self.handle.as_ref().expect("handle taken before drop")
    }
}

impl<C: Connector> DerefMut for PooledHandle<C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.handle.as_mut().expect("handle taken before drop")
    }
}

impl<C: Connector> Drop for PooledHandle<C> {
    fn drop(&mut self) {
        if let Some(h) = self.handle.take() {
            self.pool.release(h);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool as StdAtomicBool;

    struct FakeConnector {
        healthy: StdAtomicBool,
        fail_connect: StdAtomicBool,
    }

    impl FakeConnector {
        fn new() -> Self {
            Self {
                healthy: StdAtomicBool::new(true),
                fail_connect: StdAtomicBool::new(false),
            }
        }
    }

    #[async_trait::async_trait]
    impl Connector for FakeConnector {
        type Handle = u32;

        async fn connect(&self) -> Result<Self::Handle, PoolError> {
            if self.fail_connect.load(Ordering::SeqCst) {
                return Err(PoolError::Transport("refused".into()));
            }
            Ok(0)
        }

        async fn probe(&self, _handle: &mut Self::Handle) -> bool {
            self.healthy.load(Ordering::SeqCst)
        }
    }

    fn test_config() -> PoolConfig {
        PoolConfig {
            min: 2,
            max: 4,
            idle_buffer: 0.5,
            margin: 0.1,
            acquire_timeout_ms: 200,
        }
    }

    #[tokio::test]
    async fn prewarm_creates_min_handles() {
        let pool = Pool::new("test", FakeConnector::new(), &test_config());
        pool.prewarm().await.unwrap();
        let stats = pool.stats().await;
        assert_eq!(stats.created, 2);
        assert_eq!(stats.available, 2);
        assert_eq!(stats.in_use, 0);
    }

    #[tokio::test]
    async fn acquire_before_prewarm_fails_fast() {
        let pool = Pool::new("test", FakeConnector::new(), &test_config());
        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, PoolError::NotReady));
    }

    #[tokio::test]
    async fn acquire_release_round_trip_keeps_invariant() {
        let pool = Pool::new("test", FakeConnector::new(), &test_config());
        pool.prewarm().await.unwrap();

        let guard = pool.acquire().await.unwrap();
        let stats = pool.stats().await;
        assert_eq!(stats.created, 2);
        assert_eq!(stats.available, 1);
        assert_eq!(stats.in_use, 1);
        drop(guard);

        // release() is spawned; give it a moment to run.
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        let stats = pool.stats().await;
        assert_eq!(stats.available, 2);
        assert_eq!(stats.in_use, 0);
    }

    #[tokio::test]
    async fn acquire_grows_past_min_up_to_max() {
        let pool = Pool::new("test", FakeConnector::new(), &test_config());
        pool.prewarm().await.unwrap();

        let g1 = pool.acquire().await.unwrap();
        let g2 = pool.acquire().await.unwrap();
        let g3 = pool.acquire().await.unwrap();
        let stats = pool.stats().await;
        assert_eq!(stats.created, 3);
        assert_eq!(stats.in_use, 3);
        drop((g1, g2, g3));
    }

    #[tokio::test]
    async fn acquire_times_out_when_exhausted_at_max() {
        let pool = Pool::new("test", FakeConnector::new(), &test_config());
        pool.prewarm().await.unwrap();

        let _g1 = pool.acquire().await.unwrap();
        let _g2 = pool.acquire().await.unwrap();
        let _g3 = pool.acquire().await.unwrap();
        let _g4 = pool.acquire().await.unwrap();

        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, PoolError::Exhausted(_)));
    }

    #[tokio::test]
    async fn autoscale_grows_idle_toward_target_without_exceeding_max() {
        let pool = Pool::new("test", FakeConnector::new(), &test_config());
        pool.prewarm().await.unwrap();

        pool.autoscale().await;
        let stats = pool.stats().await;
        assert!(stats.created <= stats.capacity);
        assert_eq!(stats.created - stats.available, stats.in_use);
    }

    #[tokio::test]
    async fn poisoned_handle_is_not_returned_to_idle_queue() {
        let pool = Pool::new("test", FakeConnector::new(), &test_config());
        pool.prewarm().await.unwrap();

        let mut guard = pool.acquire().await.unwrap();
        guard.poison();
        drop(guard);

        tokio::time::sleep(Duration::from_millis(10)).await;
        let stats = pool.stats().await;
        assert_eq!(stats.created, 1);
        assert_eq!(stats.available, 1);
    }
}
