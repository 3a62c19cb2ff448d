use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use runtime_common::types::{PoolStats, WorkerRecord};
use tokio::sync::RwLock;

/// Process-shared, fixed-capacity worker table (§3, §4.5, §5).
///
/// Writer is each worker's own ticker (one key per worker); readers are the
/// health endpoint from any worker (§5 Shared state). Realized as a
/// `RwLock`-guarded map shared across worker tasks in one OS process (§9
/// DESIGN NOTES: "shared-memory tables replaced with a concurrent map
/// behind a mutex").
#[derive(Clone, Default)]
pub struct HeartbeatTable {
    inner: Arc<RwLock<HashMap<u32, WorkerRecord>>>,
}

impl HeartbeatTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the initial row on worker start (§4.5 step 1). Infallible in
    /// this in-memory realization — spec.md's "abort worker startup if the
    /// write fails" has no failure mode left to hit once the table is a
    /// plain in-process map rather than a cross-process shared segment.
    pub async fn insert(&self, worker_id: u32, pid: u32) {
        let now = Utc::now().timestamp();
        let record = WorkerRecord {
            worker_id,
            pid,
            first_heartbeat: now,
            last_heartbeat: now,
            rdb_pool: PoolStats::default(),
            kv_pool: PoolStats::default(),
        };
        self.inner.write().await.insert(worker_id, record);
    }

    /// Update with current pool stats on every tick (§4.5 step 4a).
    pub async fn touch(&self, worker_id: u32, rdb_pool: PoolStats, kv_pool: PoolStats) {
        let mut table = self.inner.write().await;
        if let Some(record) = table.get_mut(&worker_id) {
            record.last_heartbeat = Utc::now().timestamp();
            record.rdb_pool = rdb_pool;
            record.kv_pool = kv_pool;
        }
    }

    /// Delete the row on worker stop/exit/error (§4.5).
    pub async fn remove(&self, worker_id: u32) {
        self.inner.write().await.remove(&worker_id);
    }

    pub async fn snapshot(&self) -> Vec<WorkerRecord> {
        self.inner.read().await.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_then_snapshot_reports_the_row() {
        let table = HeartbeatTable::new();
        table.insert(1, 1000).await;
        let rows = table.snapshot().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].worker_id, 1);
    }

    #[tokio::test]
    async fn touch_advances_last_heartbeat_and_stats() {
        let table = HeartbeatTable::new();
        table.insert(1, 1000).await;

        let stats = PoolStats {
            capacity: 10,
            available: 5,
            created: 5,
            in_use: 0,
        };
        table.touch(1, stats, PoolStats::default()).await;

        let rows = table.snapshot().await;
        assert_eq!(rows[0].rdb_pool.capacity, 10);
        assert!(rows[0].last_heartbeat >= rows[0].first_heartbeat);
    }

    #[tokio::test]
    async fn remove_deletes_the_row() {
        let table = HeartbeatTable::new();
        table.insert(1, 1000).await;
        table.remove(1).await;
        assert!(table.snapshot().await.is_empty());
    }

    #[test]
    fn is_alive_within_ten_seconds() {
        let now = Utc::now().timestamp();
        let record = WorkerRecord {
            worker_id: 1,
            pid: 1,
            first_heartbeat: now,
            last_heartbeat: now - 5,
            rdb_pool: PoolStats::default(),
            kv_pool: PoolStats::default(),
        };
        assert!(record.is_alive(now));

        let stale = WorkerRecord {
            last_heartbeat: now - 11,
            ..record
        };
        assert!(!stale.is_alive(now));
    }
}
