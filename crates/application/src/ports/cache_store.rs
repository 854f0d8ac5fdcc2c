//! Cache store port
//!
//! Defines the key/value backend the export cache writes to.

use std::time::Duration;

use async_trait::async_trait;

/// Errors reported by a cache backend.
#[derive(Debug, thiserror::Error)]
pub enum CacheStoreError {
    /// The backend could not be reached.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected the operation.
    #[error("cache backend error: {0}")]
    Backend(String),
}

/// A remote-style key/value store with per-entry expiry.
///
/// Implementations handle their own concurrency; callers never hold a lock
/// across these calls.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Reads a value. Missing or expired keys yield `None`.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError>;

    /// Writes a value that expires after `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheStoreError>;

    /// Removes a key. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheStoreError>;

    /// Lists live keys starting with `prefix`.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheStoreError>;

    /// Removes every key starting with `prefix` and returns how many went.
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheStoreError>;

    /// Approximate bytes held by the store.
    async fn memory_used(&self) -> Result<u64, CacheStoreError>;
}
