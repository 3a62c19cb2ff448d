use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use runtime_common::types::PoolStats;
use tokio::sync::Mutex;

use crate::error::CacheTableError;

#[derive(Clone, Debug)]
struct CacheEntry {
    value: Vec<u8>,
    created_at: i64,
    expires_at: i64,
    last_access: i64,
    usage: u64,
}

impl CacheEntry {
    fn is_live(&self, now: i64) -> bool {
        self.expires_at > now
    }
}

struct Inner {
    entries: HashMap<String, CacheEntry>,
}

/// Process-shared, fixed-capacity TTL/LRU cache table (§3, §4.8). Backs the
/// per-worker hot-data path; distinct from the tag-keyed, KV-backed read
/// -through cache service layered on top of it.
pub struct CacheTable {
    inner: Mutex<Inner>,
    max_entries: usize,
}

impl CacheTable {
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::with_capacity(max_entries),
            }),
            max_entries,
        }
    }

    /// Write an entry, evicting one entry first if the table is at its
    /// high-water mark and `key` is not already present (§4.8 `put`).
    pub async fn put(&self, key: impl Into<String>, value: Vec<u8>, ttl: Duration) -> Result<(), CacheTableError> {
        let key = key.into();
        let now = Utc::now().timestamp();
        let mut inner = self.inner.lock().await;

        if inner.entries.len() >= self.max_entries && !inner.entries.contains_key(&key) {
            evict_one(&mut inner.entries);
        }

        inner.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
                expires_at: now + ttl.as_secs() as i64,
                last_access: now,
                usage: 0,
            },
        );
        Ok(())
    }

    /// Read an entry; a miss is either absence or a stale (`expires_at <=
    /// now`) entry, which is cleaned up eagerly (§4.8 `get`).
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let now = Utc::now().timestamp();
        let mut inner = self.inner.lock().await;

        let live = inner.entries.get(key).map(|e| e.is_live(now)).unwrap_or(false);
        if !live {
            inner.entries.remove(key);
            return None;
        }

        let entry = inner.entries.get_mut(key).expect("checked live above");
        entry.last_access = now;
        entry.usage += 1;
        Some(entry.value.clone())
    }

    pub async fn invalidate(&self, key: &str) {
        self.inner.lock().await.entries.remove(key);
    }

    /// Sweep expired entries, then evict by rank until back under the
    /// high-water mark (§4.8 `gc`, run by the per-worker ticker).
    pub async fn gc(&self) {
        let now = Utc::now().timestamp();
        let mut inner = self.inner.lock().await;

        let before = inner.entries.len();
        inner.entries.retain(|_, e| e.is_live(now));
        let expired = before - inner.entries.len();

        let mut evicted = 0;
        while inner.entries.len() > self.max_entries {
            if !evict_one(&mut inner.entries) {
                break;
            }
            evicted += 1;
        }

        if expired > 0 || evicted > 0 {
            tracing::debug!(expired, evicted, "cache table gc pass");
        }
        metrics::gauge!("cache_table.entries").set(inner.entries.len() as f64);
    }

    pub async fn stats(&self) -> PoolStats {
        let inner = self.inner.lock().await;
        let created = inner.entries.len() as u32;
        PoolStats {
            capacity: self.max_entries as u32,
            available: (self.max_entries as u32).saturating_sub(created),
            created,
            in_use: created,
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.inner.lock().await.entries.keys().cloned().collect()
    }
}

/// Evict the lowest-ranked entry: `(usage ASC, last_access ASC)`, ties
/// broken by key order (§4.8 eviction order). Returns false if the table
/// was empty.
fn evict_one(entries: &mut HashMap<String, CacheEntry>) -> bool {
    let victim = entries
        .iter()
        .min_by(|(ka, a), (kb, b)| {
            (a.usage, a.last_access, ka.as_str()).cmp(&(b.usage, b.last_access, kb.as_str()))
        })
        .map(|(k, _)| k.clone());

    match victim {
        Some(k) => {
            entries.remove(&k);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_returns_value_before_expiry() {
        let table = CacheTable::new(10);
        table.put("k", b"v".to_vec(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(table.get("k").await, Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn get_returns_miss_after_ttl_elapses() {
        let table = CacheTable::new(10);
        table.put("k", b"v".to_vec(), Duration::from_secs(0)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(table.get("k").await, None);
    }

    #[tokio::test]
    async fn invalidate_removes_entry() {
        let table = CacheTable::new(10);
        table.put("k", b"v".to_vec(), Duration::from_secs(60)).await.unwrap();
        table.invalidate("k").await;
        assert_eq!(table.get("k").await, None);
    }

    #[tokio::test]
    async fn put_at_capacity_evicts_least_used_entry() {
        let table = CacheTable::new(2);
        table.put("a", b"1".to_vec(), Duration::from_secs(60)).await.unwrap();
        table.put("b", b"2".to_vec(), Duration::from_secs(60)).await.unwrap();

        // Touch "b" so it outranks "a" in usage.
        table.get("b").await;

        table.put("c", b"3".to_vec(), Duration::from_secs(60)).await.unwrap();

        assert_eq!(table.len().await, 2);
        assert_eq!(table.get("a").await, None);
        assert!(table.get("b").await.is_some());
        assert!(table.get("c").await.is_some());
    }

    #[tokio::test]
    async fn gc_removes_expired_and_enforces_high_water_mark() {
        let table = CacheTable::new(5);
        table.put("expired", b"x".to_vec(), Duration::from_secs(0)).await.unwrap();
        table.put("live", b"y".to_vec(), Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;
        table.gc().await;

        assert_eq!(table.len().await, 1);
        assert!(table.get("live").await.is_some());
    }
}
