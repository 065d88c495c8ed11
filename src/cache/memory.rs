//! In-memory cache backend.
//!
//! Bounded by entry count. When a new key arrives at capacity the oldest
//! inserted key is evicted. Expired entries are dropped when read. A zero TTL
//! means no expiry.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::Instant;

use crate::cache::{CacheError, CacheStore};

#[derive(Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    order: VecDeque<String>,
}

impl Inner {
    fn remove(&mut self, key: &str) -> Option<Entry> {
        let entry = self.entries.remove(key)?;
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        Some(entry)
    }
}

/// Process-local store.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    max_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl MemoryStore {
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_size: max_size.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let mut inner = self.inner.lock();
        let expired = match inner.entries.get(key) {
            None => return Ok(None),
            Some(entry) => entry.is_expired(Instant::now()),
        };

        if expired {
            inner.remove(key);
            return Ok(None);
        }
        Ok(inner.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), CacheError> {
        let entry = Entry {
            value,
            expires_at: ttl.filter(|ttl| !ttl.is_zero()).map(|ttl| Instant::now() + ttl),
        };

        let mut inner = self.inner.lock();
        if let Some(existing) = inner.entries.get_mut(key) {
            *existing = entry;
            return Ok(());
        }

        while inner.entries.len() >= self.max_size {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
            tracing::trace!(key = %oldest, "Evicted cache entry");
        }

        inner.order.push_back(key.to_owned());
        inner.entries.insert(key.to_owned(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.inner.lock().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_set() {
        let store = MemoryStore::new(10);
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", json!({ "a": 1 }), None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!({ "a": 1 })));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let store = MemoryStore::new(10);
        store
            .set("short", json!("x"), Some(Duration::from_secs(5)))
            .await
            .unwrap();
        store.set("forever", json!("y"), None).await.unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(store.get("short").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get("short").await.unwrap().is_none());
        assert!(store.get("forever").await.unwrap().is_some());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_never_expires() {
        let store = MemoryStore::new(10);
        store.set("k", json!("v"), Some(Duration::ZERO)).await.unwrap();

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert_eq!(store.get("k").await.unwrap(), Some(json!("v")));
    }

    #[tokio::test]
    async fn test_evicts_oldest_at_capacity() {
        let store = MemoryStore::new(2);
        store.set("a", json!(1), None).await.unwrap();
        store.set("b", json!(2), None).await.unwrap();
        store.set("c", json!(3), None).await.unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.get("a").await.unwrap().is_none());
        assert!(store.get("b").await.unwrap().is_some());
        assert!(store.get("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_overwrite_does_not_evict() {
        let store = MemoryStore::new(2);
        store.set("a", json!(1), None).await.unwrap();
        store.set("b", json!(2), None).await.unwrap();
        store.set("a", json!(10), None).await.unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a").await.unwrap(), Some(json!(10)));
        assert_eq!(store.get("b").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_delete_frees_slot() {
        let store = MemoryStore::new(2);
        store.set("a", json!(1), None).await.unwrap();
        store.set("b", json!(2), None).await.unwrap();
        store.delete("a").await.unwrap();
        store.set("c", json!(3), None).await.unwrap();

        assert!(store.get("b").await.unwrap().is_some());
        assert!(store.get("c").await.unwrap().is_some());
        store.clear().await.unwrap();
        assert!(store.is_empty());
    }
}
