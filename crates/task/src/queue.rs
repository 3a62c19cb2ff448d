use runtime_common::types::TaskEnvelope;
use runtime_pool::{KvPool, PoolError};

use crate::error::TaskError;

/// Single stream carrying every task class — generalizes the teacher's
/// per-priority work-order streams (`workorders:high/normal/low`) to one
/// stream of generic `TaskEnvelope`s, since spec.md's task subsystem has no
/// priority concept of its own.
pub const STREAM_DEFAULT: &str = "tasks:default";
pub const CONSUMER_GROUP: &str = "task-workers";

/// Cross-worker task queue backed by Redis Streams (§4.6), generalizing
/// `queue/mod.rs`'s `XADD`/`XREADGROUP`/`XACK`/`XCLAIM` machinery from
/// work-order-specific messages to a generic `TaskEnvelope`.
pub struct TaskQueue {
    kv: KvPool,
}

impl TaskQueue {
    pub fn new(kv: KvPool) -> Self {
        Self { kv }
    }

    /// Create the stream + consumer group if missing. Safe to call on every
    /// worker startup — tolerates `BUSYGROUP` (already exists).
    pub async fn initialize(&self) -> Result<(), TaskError> {
        self.kv
            .with_connection_and_retry(|conn| {
                Box::pin(async move {
                    let result: Result<String, redis::RedisError> = redis::cmd("XGROUP")
                        .arg("CREATE")
                        .arg(STREAM_DEFAULT)
                        .arg(CONSUMER_GROUP)
                        .arg("$")
                        .arg("MKSTREAM")
                        .query_async(conn)
                        .await;

                    match result {
                        Ok(_) => Ok(()),
                        Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
                        Err(e) => Err(PoolError::Transport(e.to_string())),
                    }
                })
            })
            .await?;
        Ok(())
    }

    /// Enqueue an envelope (§4.6 `dispatch`). Returns whether the enqueue
    /// succeeded — failures are swallowed into `false` rather than
    /// propagated, matching spec.md's "returns a boolean."
    pub async fn dispatch(&self, envelope: &TaskEnvelope) -> bool {
        let data = match serde_json::to_string(envelope) {
            Ok(d) => d,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize task envelope");
                return false;
            }
        };

        let result = self
            .kv
            .with_connection_and_retry(|conn| {
                let data = data.clone();
                Box::pin(async move {
                    redis::cmd("XADD")
                        .arg(STREAM_DEFAULT)
                        .arg("*")
                        .arg("data")
                        .arg(&data)
                        .query_async::<String>(conn)
                        .await
                        .map_err(|e| PoolError::Transport(e.to_string()))
                })
            })
            .await;

        if result.is_err() {
            tracing::warn!(class = %envelope.class, "failed to dispatch task to cross-worker queue");
        }
        result.is_ok()
    }

    /// Dequeue the next envelope, preferring previously-delivered-but-
    /// unacknowledged entries (reclaimed via `ID=0`) before reading new ones
    /// with `>`. Returns `(entry_id, envelope)`.
    pub async fn dequeue(
        &self,
        consumer_name: &str,
        block_ms: Option<u64>,
    ) -> Result<Option<(String, TaskEnvelope)>, TaskError> {
        let consumer_name = consumer_name.to_string();

        let pending = self
            .kv
            .with_connection_and_retry(|conn| {
                let consumer_name = consumer_name.clone();
                Box::pin(async move {
                    let value: Option<redis::Value> = redis::cmd("XREADGROUP")
                        .arg("GROUP")
                        .arg(CONSUMER_GROUP)
                        .arg(&consumer_name)
                        .arg("COUNT")
                        .arg(1)
                        .arg("STREAMS")
                        .arg(STREAM_DEFAULT)
                        .arg("0")
                        .query_async(conn)
                        .await
                        .map_err(|e| PoolError::Transport(e.to_string()))?;
                    Ok(value)
                })
            })
            .await?;

        if let Some(item) = parse_xreadgroup_response(pending) {
            return Ok(Some(item));
        }

        let new_entries = self
            .kv
            .with_connection_and_retry(|conn| {
                let consumer_name = consumer_name.clone();
                Box::pin(async move {
                    let mut cmd = redis::cmd("XREADGROUP");
                    cmd.arg("GROUP").arg(CONSUMER_GROUP).arg(&consumer_name);
                    if let Some(ms) = block_ms {
                        cmd.arg("BLOCK").arg(ms);
                    }
                    cmd.arg("COUNT").arg(1).arg("STREAMS").arg(STREAM_DEFAULT).arg(">");

                    let value: Option<redis::Value> = cmd
                        .query_async(conn)
                        .await
                        .map_err(|e| PoolError::Transport(e.to_string()))?;
                    Ok(value)
                })
            })
            .await?;

        Ok(parse_xreadgroup_response(new_entries))
    }

    pub async fn ack(&self, entry_id: &str) -> Result<(), TaskError> {
        let entry_id = entry_id.to_string();
        self.kv
            .with_connection_and_retry(|conn| {
                let entry_id = entry_id.clone();
                Box::pin(async move {
                    redis::cmd("XACK")
                        .arg(STREAM_DEFAULT)
                        .arg(CONSUMER_GROUP)
                        .arg(&entry_id)
                        .query_async::<i64>(conn)
                        .await
                        .map_err(|e| PoolError::Transport(e.to_string()))?;
                    Ok(())
                })
            })
            .await?;
        Ok(())
    }

    /// Reclaim entries idle for at least `min_idle_ms` from dead consumers
    /// (§4.6, generalized from `reclaim_pending`).
    pub async fn reclaim_pending(
        &self,
        consumer_name: &str,
        min_idle_ms: u64,
    ) -> Result<Vec<(String, TaskEnvelope)>, TaskError> {
        let consumer_name = consumer_name.to_string();

        let pending = self
            .kv
            .with_connection_and_retry(|conn| {
                Box::pin(async move {
                    let value: redis::Value = redis::cmd("XPENDING")
                        .arg(STREAM_DEFAULT)
                        .arg(CONSUMER_GROUP)
                        .arg("IDLE")
                        .arg(min_idle_ms)
                        .arg("-")
                        .arg("+")
                        .arg(10)
                        .query_async(conn)
                        .await
                        .map_err(|e| PoolError::Transport(e.to_string()))?;
                    Ok(value)
                })
            })
            .await?;

        let entry_ids = extract_pending_ids(&pending);
        if entry_ids.is_empty() {
            return Ok(Vec::new());
        }

        let claimed = self
            .kv
            .with_connection_and_retry(|conn| {
                let consumer_name = consumer_name.clone();
                let entry_ids = entry_ids.clone();
                Box::pin(async move {
                    let mut cmd = redis::cmd("XCLAIM");
                    cmd.arg(STREAM_DEFAULT).arg(CONSUMER_GROUP).arg(&consumer_name).arg(min_idle_ms);
                    for id in &entry_ids {
                        cmd.arg(id.as_str());
                    }
                    let value: redis::Value = cmd
                        .query_async(conn)
                        .await
                        .map_err(|e| PoolError::Transport(e.to_string()))?;
                    Ok(value)
                })
            })
            .await?;

        let reclaimed = parse_xclaim_response(&claimed);
        if !reclaimed.is_empty() {
            tracing::info!(count = reclaimed.len(), "reclaimed pending tasks");
        }
        Ok(reclaimed)
    }
}

fn parse_xreadgroup_response(value: Option<redis::Value>) -> Option<(String, TaskEnvelope)> {
    let streams = match value? {
        redis::Value::Array(arr) => arr,
        _ => return None,
    };

    for stream_pair in streams {
        let pair = match stream_pair {
            redis::Value::Array(p) if p.len() >= 2 => p,
            _ => continue,
        };

        let entries = match &pair[1] {
            redis::Value::Array(e) => e,
            _ => continue,
        };

        for entry in entries {
            let entry_pair = match entry {
                redis::Value::Array(ep) if ep.len() >= 2 => ep,
                _ => continue,
            };

            let entry_id = match &entry_pair[0] {
                redis::Value::BulkString(b) => String::from_utf8_lossy(b).to_string(),
                _ => continue,
            };

            let fields = match &entry_pair[1] {
                redis::Value::Array(f) => f,
                _ => continue,
            };

            if let Some(envelope) = extract_data_field(fields) {
                return Some((entry_id, envelope));
            }
        }
    }

    None
}

fn extract_data_field(fields: &[redis::Value]) -> Option<TaskEnvelope> {
    let mut i = 0;
    while i + 1 < fields.len() {
        let key = match &fields[i] {
            redis::Value::BulkString(b) => String::from_utf8_lossy(b).to_string(),
            _ => {
                i += 2;
                continue;
            }
        };

        if key == "data" {
            let data = match &fields[i + 1] {
                redis::Value::BulkString(b) => String::from_utf8_lossy(b).to_string(),
                _ => return None,
            };
            return match serde_json::from_str(&data) {
                Ok(envelope) => Some(envelope),
                Err(e) => {
                    tracing::error!(error = %e, data = %data, "failed to deserialize task envelope");
                    None
                }
            };
        }

        i += 2;
    }
    None
}

fn extract_pending_ids(value: &redis::Value) -> Vec<String> {
    let mut ids = Vec::new();
    if let redis::Value::Array(entries) = value {
        for entry in entries {
            if let redis::Value::Array(fields) = entry {
                if let Some(redis::Value::BulkString(id_bytes)) = fields.first() {
                    ids.push(String::from_utf8_lossy(id_bytes).to_string());
                }
            }
        }
    }
    ids
}

fn parse_xclaim_response(value: &redis::Value) -> Vec<(String, TaskEnvelope)> {
    let entries = match value {
        redis::Value::Array(arr) => arr,
        _ => return Vec::new(),
    };

    let mut results = Vec::new();
    for entry in entries {
        let entry_pair = match entry {
            redis::Value::Array(ep) if ep.len() >= 2 => ep,
            _ => continue,
        };

        let entry_id = match &entry_pair[0] {
            redis::Value::BulkString(b) => String::from_utf8_lossy(b).to_string(),
            _ => continue,
        };

        let fields = match &entry_pair[1] {
            redis::Value::Array(f) => f,
            _ => continue,
        };

        if let Some(envelope) = extract_data_field(fields) {
            results.push((entry_id, envelope));
        }
    }

    results
}
