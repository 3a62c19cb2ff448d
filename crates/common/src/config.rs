use serde::{Deserialize, Serialize};

/// Top-level system configuration, deserialized from `system.toml` and
/// overridden by environment variables for anything connection-shaped
/// (hosts, credentials, ports), mirroring how the source engine layers
/// `AUTOSINT_CONFIG_DIR`/`DATABASE_URL`/`REDIS_URL` env reads on top of its
/// TOML file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SystemConfig {
    pub server: ServerConfig,
    pub rdb_pool: PoolConfig,
    pub kv_pool: PoolConfig,
    pub cache_table: CacheTableConfig,
    pub task: TaskConfig,
}

/// HTTP listener and worker topology.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Number of worker tasks the master spawns (§4.5, §5).
    pub workers: u32,
    /// Fixed-window rate limit applied per path by the global middleware chain (§4.3).
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_cert_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_key_path: Option<String>,
}

fn default_rate_limit_per_minute() -> u64 {
    600
}

/// Elastic connection pool parameters, shared shape for RDB and KV (§4.1).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolConfig {
    pub min: u32,
    pub max: u32,
    /// Fraction of `max` the pool tries to keep idle. Default 0.05.
    #[serde(default = "default_idle_buffer")]
    pub idle_buffer: f64,
    /// Symmetric tolerance band around the idle target. Default 0.05 (±5%).
    #[serde(default = "default_margin")]
    pub margin: f64,
    /// Acquire timeout in milliseconds. Default 1000 (1.0s, per spec.md §5).
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

fn default_idle_buffer() -> f64 {
    0.05
}

fn default_margin() -> f64 {
    0.05
}

fn default_acquire_timeout_ms() -> u64 {
    1000
}

/// Shared cache table sizing (§4.8).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheTableConfig {
    /// Max cardinality N before the high-water mark triggers eviction.
    pub max_entries: usize,
    /// GC sweep interval in seconds, run by the per-worker ticker (§4.5).
    #[serde(default = "default_gc_interval_seconds")]
    pub gc_interval_seconds: u64,
}

fn default_gc_interval_seconds() -> u64 {
    5
}

/// Task subsystem sizing (§4.6, §4.7).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Capacity of the in-process bounded channel per worker.
    pub channel_capacity: usize,
    /// Number of cross-worker task-consumer tasks.
    pub cross_worker_pool_size: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                workers: 4,
                rate_limit_per_minute: 600,
                tls_cert_path: None,
                tls_key_path: None,
            },
            rdb_pool: PoolConfig {
                min: 2,
                max: 20,
                idle_buffer: 0.05,
                margin: 0.05,
                acquire_timeout_ms: 1000,
            },
            kv_pool: PoolConfig {
                min: 2,
                max: 20,
                idle_buffer: 0.05,
                margin: 0.05,
                acquire_timeout_ms: 1000,
            },
            cache_table: CacheTableConfig {
                max_entries: 10_000,
                gc_interval_seconds: 5,
            },
            task: TaskConfig {
                channel_capacity: 256,
                cross_worker_pool_size: 4,
            },
        }
    }
}
