use std::time::Duration;

use runtime_common::keying::{self, ListQuery};
use runtime_pool::{KvPool, PoolError};

use crate::error::CacheServiceError;

const DEFAULT_RECORD_TTL: Duration = Duration::from_secs(300);
const DEFAULT_LIST_TTL: Duration = Duration::from_secs(10);

/// Read-through, tag-invalidated cache service over the KV pool (§4.9). Not
/// to be confused with `runtime_cache_table::CacheTable`, which backs
/// intra-worker hot data rather than this cross-worker KV-resident layer.
#[derive(Clone)]
pub struct CacheService {
    kv: KvPool,
}

impl CacheService {
    pub fn new(kv: KvPool) -> Self {
        Self { kv }
    }

    pub async fn get_record(&self, entity: &str, id: &str) -> Result<Option<Vec<u8>>, CacheServiceError> {
        self.get_raw(&keying::record_key(entity, id)).await
    }

    pub async fn set_record(&self, entity: &str, id: &str, data: &[u8]) -> Result<(), CacheServiceError> {
        self.set_raw(&keying::record_key(entity, id), data, DEFAULT_RECORD_TTL)
            .await
    }

    pub async fn get_record_by_column(
        &self,
        entity: &str,
        column: &str,
        value: &str,
    ) -> Result<Option<Vec<u8>>, CacheServiceError> {
        self.get_raw(&keying::record_column_key(entity, column, value)).await
    }

    pub async fn set_record_by_column(
        &self,
        entity: &str,
        column: &str,
        value: &str,
        data: &[u8],
    ) -> Result<(), CacheServiceError> {
        self.set_raw(
            &keying::record_column_key(entity, column, value),
            data,
            DEFAULT_RECORD_TTL,
        )
        .await
    }

    /// Reads the current list tag, builds the tag-scoped list key, and does
    /// a plain GET — a stale (pre-bump) key is simply never looked up again,
    /// which realizes "mismatched tag reads as miss" (§4.9) without needing
    /// a stored-tag comparison.
    pub async fn get_list(&self, entity: &str, query: &ListQuery) -> Result<Option<Vec<u8>>, CacheServiceError> {
        let tag = self.current_list_tag(entity).await?;
        self.get_raw(&keying::list_key(entity, tag, query)).await
    }

    pub async fn set_list(&self, entity: &str, query: &ListQuery, data: &[u8]) -> Result<(), CacheServiceError> {
        let tag = self.current_list_tag(entity).await?;
        self.set_raw(&keying::list_key(entity, tag, query), data, DEFAULT_LIST_TTL)
            .await
    }

    pub async fn invalidate_record(&self, entity: &str, id: &str) -> Result<(), CacheServiceError> {
        self.del(&keying::record_key(entity, id)).await
    }

    pub async fn invalidate_record_by_column(
        &self,
        entity: &str,
        column: &str,
        value: &str,
    ) -> Result<(), CacheServiceError> {
        self.del(&keying::record_column_key(entity, column, value)).await
    }

    /// Bumps `list-tag:{entity}`, orphaning every list key stored under the
    /// prior tag value (§4.9 `invalidate_lists`).
    pub async fn invalidate_lists(&self, entity: &str) -> Result<(), CacheServiceError> {
        let key = keying::list_tag_key(entity);
        self.kv
            .with_connection_and_retry(|conn| {
                let key = key.clone();
                Box::pin(async move {
                    redis::cmd("INCR")
                        .arg(&key)
                        .query_async::<i64>(conn)
                        .await
                        .map_err(|e| PoolError::Transport(e.to_string()))?;
                    Ok(())
                })
            })
            .await?;
        Ok(())
    }

    async fn current_list_tag(&self, entity: &str) -> Result<u64, CacheServiceError> {
        let key = keying::list_tag_key(entity);
        let tag = self
            .kv
            .with_connection_and_retry(|conn| {
                let key = key.clone();
                Box::pin(async move {
                    let raw: Option<i64> = redis::cmd("GET")
                        .arg(&key)
                        .query_async(conn)
                        .await
                        .map_err(|e| PoolError::Transport(e.to_string()))?;
                    Ok(raw.unwrap_or(0) as u64)
                })
            })
            .await?;
        Ok(tag)
    }

    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheServiceError> {
        let key = key.to_string();
        let value = self
            .kv
            .with_connection_and_retry(|conn| {
                let key = key.clone();
                Box::pin(async move {
                    let raw: Option<Vec<u8>> = redis::cmd("GET")
                        .arg(&key)
                        .query_async(conn)
                        .await
                        .map_err(|e| PoolError::Transport(e.to_string()))?;
                    Ok(raw)
                })
            })
            .await?;

        if value.is_some() {
            metrics::counter!("cache_service.hit").increment(1);
        } else {
            metrics::counter!("cache_service.miss").increment(1);
        }
        Ok(value)
    }

    async fn set_raw(&self, key: &str, data: &[u8], ttl: Duration) -> Result<(), CacheServiceError> {
        let key = key.to_string();
        let data = data.to_vec();
        let ttl_secs = ttl.as_secs();
        self.kv
            .with_connection_and_retry(|conn| {
                let key = key.clone();
                let data = data.clone();
                Box::pin(async move {
                    redis::cmd("SET")
                        .arg(&key)
                        .arg(&data)
                        .arg("EX")
                        .arg(ttl_secs)
                        .query_async::<()>(conn)
                        .await
                        .map_err(|e| PoolError::Transport(e.to_string()))
                })
            })
            .await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheServiceError> {
        let key = key.to_string();
        self.kv
            .with_connection_and_retry(|conn| {
                let key = key.clone();
                Box::pin(async move {
                    redis::cmd("DEL")
                        .arg(&key)
                        .query_async::<i64>(conn)
                        .await
                        .map_err(|e| PoolError::Transport(e.to_string()))?;
                    Ok(())
                })
            })
            .await?;
        Ok(())
    }
}
