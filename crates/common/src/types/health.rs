use serde::{Deserialize, Serialize};

/// Point-in-time stats for one connection pool (§3, §4.1 `stats()`).
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct PoolStats {
    pub capacity: u32,
    pub available: u32,
    pub created: u32,
    pub in_use: u32,
}

/// One worker's row in the shared heartbeat table (§3, §4.5).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub worker_id: u32,
    pub pid: u32,
    pub first_heartbeat: i64,
    pub last_heartbeat: i64,
    pub rdb_pool: PoolStats,
    pub kv_pool: PoolStats,
}

impl WorkerRecord {
    /// A worker is alive iff its last heartbeat is under 10s old (§5 Cancellation/timeouts).
    pub fn is_alive(&self, now: i64) -> bool {
        now - self.last_heartbeat < 10
    }
}

/// `GET /health` response body (§6).
#[derive(Clone, Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub uptime: i64,
    pub ts: i64,
    pub pid: u32,
    pub workers_count: usize,
    pub workers: Vec<WorkerRecord>,
    pub cache: PoolStats,
    pub cache_count: usize,
    pub cache_data: Vec<String>,
    pub server: ServerInfo,
}

#[derive(Clone, Debug, Serialize)]
pub struct ServerInfo {
    pub host: String,
    pub port: u16,
}

/// `{error, error_full, code, trace, file, line}` error body (§6, §7).
#[derive(Clone, Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_full: Option<String>,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}
