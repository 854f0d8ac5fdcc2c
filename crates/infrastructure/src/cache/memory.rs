//! In-process cache store on top of `moka`.
//!
//! Entries carry their own time-to-live, so one store can hold results
//! written under different cache configurations.

use std::time::{Duration, Instant};

use apidock_application::{CacheStore, CacheStoreError};
use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use tracing::debug;

/// Entry limit used by [`MemoryCacheStore::default`].
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

#[derive(Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Bounded in-memory [`CacheStore`].
#[derive(Clone)]
pub struct MemoryCacheStore {
    cache: Cache<String, Entry>,
}

impl MemoryCacheStore {
    /// Creates a store holding at most `max_entries` results.
    #[must_use]
    pub fn new(max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }

    fn matching(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.as_ref().clone())
            .collect();
        keys.sort();
        keys
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl std::fmt::Debug for MemoryCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCacheStore")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError> {
        Ok(self.cache.get(key).await.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheStoreError> {
        self.cache.insert(key.to_string(), Entry { value, ttl }).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheStoreError> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheStoreError> {
        Ok(self.matching(prefix))
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheStoreError> {
        let keys = self.matching(prefix);
        for key in &keys {
            self.cache.invalidate(key).await;
        }
        debug!(prefix, removed = keys.len(), "cache prefix invalidated");
        Ok(keys.len())
    }

    async fn memory_used(&self) -> Result<u64, CacheStoreError> {
        let bytes: usize = self
            .cache
            .iter()
            .map(|(key, entry)| key.len() + entry.value.len())
            .sum();
        Ok(bytes as u64)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryCacheStore::default();
        store.set("export:c1:postman:aa", "{}".to_string(), HOUR).await.unwrap();

        assert_eq!(store.get("export:c1:postman:aa").await.unwrap().as_deref(), Some("{}"));
        store.delete("export:c1:postman:aa").await.unwrap();
        assert_eq!(store.get("export:c1:postman:aa").await.unwrap(), None);
        store.delete("export:c1:postman:aa").await.unwrap();
    }

    #[tokio::test]
    async fn test_prefix_operations() {
        let store = MemoryCacheStore::default();
        for key in ["export:c1:postman:1", "export:c1:openapi:2", "export:c10:postman:3"] {
            store.set(key, "x".to_string(), HOUR).await.unwrap();
        }

        assert_eq!(
            store.keys("export:c1:").await.unwrap(),
            vec!["export:c1:openapi:2", "export:c1:postman:1"]
        );
        assert_eq!(store.delete_prefix("export:c1:").await.unwrap(), 2);
        assert_eq!(store.keys("export:").await.unwrap(), vec!["export:c10:postman:3"]);
        assert_eq!(store.delete_prefix("export:c2:").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_entries_expire_after_their_ttl() {
        let store = MemoryCacheStore::default();
        store
            .set("short", "a".to_string(), Duration::from_millis(50))
            .await
            .unwrap();
        store.set("long", "b".to_string(), HOUR).await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(store.get("short").await.unwrap(), None);
        assert_eq!(store.get("long").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_memory_used_counts_keys_and_values() {
        let store = MemoryCacheStore::default();
        store.set("ab", "1234".to_string(), HOUR).await.unwrap();
        store.set("cd", "56".to_string(), HOUR).await.unwrap();

        assert_eq!(store.memory_used().await.unwrap(), 10);
    }
}
