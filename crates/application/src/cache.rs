//! Export result cache
//!
//! Derives deterministic keys from `(collection id, format, options)` and
//! stores rendered [`ExportResult`]s in a [`CacheStore`].
//!
//! The cache knows nothing about document state. Whoever mutates a
//! collection, folder, endpoint or environment must call
//! [`ExportCache::invalidate_collection`].

use std::borrow::Cow;
use std::sync::Arc;

use apidock_domain::{ExportFormat, ExportOptions, ExportResult};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::error::ExportError;
use crate::ports::{CacheStore, CacheStoreError};

/// Bytes of the options digest kept in a key.
const DIGEST_BYTES: usize = 8;

/// Errors raised by cache writes and invalidations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The serialized entry exceeds the configured maximum.
    #[error("cache entry of {size} bytes exceeds the {max} byte limit")]
    EntryTooLarge {
        /// Serialized size.
        size: usize,
        /// Configured limit.
        max: usize,
    },

    /// The result could not be serialized.
    #[error("failed to serialize cache entry: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend failed.
    #[error(transparent)]
    Store(#[from] CacheStoreError),
}

impl From<CacheError> for ExportError {
    fn from(error: CacheError) -> Self {
        Self::CacheUnavailable(error.to_string())
    }
}

/// Snapshot of cache configuration and occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Whether caching is on.
    pub enabled: bool,
    /// Live keys under the configured prefix.
    pub key_count: usize,
    /// Approximate bytes held by the backend.
    pub memory_used: u64,
    /// Entry lifetime in seconds.
    pub ttl_secs: u64,
    /// Largest accepted entry in bytes.
    pub max_entry_bytes: usize,
    /// Key namespace.
    pub key_prefix: String,
}

/// Cache of rendered exports.
#[derive(Clone)]
pub struct ExportCache {
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
}

impl ExportCache {
    /// Creates a cache over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self { store, config }
    }

    /// Whether caching is on.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Derives the key for an export.
    ///
    /// The key is `prefix:collection:format:digest` where `digest` is the
    /// hex of the first eight bytes of a SHA-256 over the canonical JSON of
    /// `options`. A `:` or `%` inside the collection id is percent-escaped
    /// so one collection's keys never share a prefix with another's.
    /// Returns an empty string when caching is disabled; callers
    /// treat an empty key as "do not cache".
    #[must_use]
    pub fn generate_key(
        &self,
        collection_id: &str,
        format: ExportFormat,
        options: &ExportOptions,
    ) -> String {
        if !self.config.enabled {
            return String::new();
        }

        let canonical = match canonical_options(options) {
            Ok(canonical) => canonical,
            Err(error) => {
                warn!(%error, collection_id, "could not canonicalize export options, skipping cache");
                return String::new();
            }
        };
        let digest = Sha256::digest(canonical.as_bytes());

        format!(
            "{}:{}:{}:{}",
            self.config.key_prefix,
            key_segment(collection_id),
            format,
            hex::encode(&digest[..DIGEST_BYTES])
        )
    }

    /// Looks a result up.
    ///
    /// Misses, a disabled cache and backend failures all yield `None`. An
    /// entry that fails to deserialize is deleted and reported as a miss.
    pub async fn get(&self, key: &str) -> Option<ExportResult> {
        if !self.config.enabled || key.is_empty() {
            return None;
        }

        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(cache_key = key, "cache miss");
                return None;
            }
            Err(error) => {
                warn!(%error, cache_key = key, "cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<ExportResult>(&raw) {
            Ok(result) => {
                debug!(cache_key = key, "cache hit");
                Some(result)
            }
            Err(error) => {
                warn!(%error, cache_key = key, "corrupt cache entry, deleting");
                if let Err(error) = self.store.delete(key).await {
                    warn!(%error, cache_key = key, "failed to delete corrupt cache entry");
                }
                None
            }
        }
    }

    /// Stores a result under `key`.
    ///
    /// A disabled cache or an empty key is a silent no-op.
    ///
    /// # Errors
    /// Returns an error when the entry is too large or the backend fails.
    /// Neither is meant to fail the export that produced `result`.
    pub async fn set(&self, key: &str, result: &ExportResult) -> Result<(), CacheError> {
        if !self.config.enabled || key.is_empty() {
            return Ok(());
        }

        let raw = serde_json::to_string(result)?;
        if raw.len() > self.config.max_entry_bytes {
            return Err(CacheError::EntryTooLarge {
                size: raw.len(),
                max: self.config.max_entry_bytes,
            });
        }

        self.store.set(key, raw, self.config.ttl()).await?;
        debug!(cache_key = key, size = result.size, "cached export");
        Ok(())
    }

    /// Drops every cached export of a collection, across formats.
    ///
    /// # Errors
    /// Returns an error when the backend fails.
    pub async fn invalidate_collection(&self, collection_id: &str) -> Result<usize, CacheError> {
        let prefix = format!("{}:{}:", self.config.key_prefix, key_segment(collection_id));
        self.invalidate_prefix(&prefix, collection_id).await
    }

    /// Drops cached exports of a collection in one format.
    ///
    /// # Errors
    /// Returns an error when the backend fails.
    pub async fn invalidate_collection_format(
        &self,
        collection_id: &str,
        format: ExportFormat,
    ) -> Result<usize, CacheError> {
        let prefix = format!(
            "{}:{}:{}:",
            self.config.key_prefix,
            key_segment(collection_id),
            format
        );
        self.invalidate_prefix(&prefix, collection_id).await
    }

    async fn invalidate_prefix(&self, prefix: &str, collection_id: &str) -> Result<usize, CacheError> {
        if !self.config.enabled {
            return Ok(0);
        }
        let removed = self.store.delete_prefix(prefix).await?;
        debug!(collection_id, removed, "invalidated cached exports");
        Ok(removed)
    }

    /// Reports configuration and occupancy. Backend failures read as zero.
    pub async fn stats(&self) -> CacheStats {
        let (key_count, memory_used) = if self.config.enabled {
            let prefix = format!("{}:", self.config.key_prefix);
            let key_count = self.store.keys(&prefix).await.map_or_else(
                |error| {
                    warn!(%error, "failed to count cache keys");
                    0
                },
                |keys| keys.len(),
            );
            let memory_used = self.store.memory_used().await.unwrap_or_else(|error| {
                warn!(%error, "failed to read cache memory usage");
                0
            });
            (key_count, memory_used)
        } else {
            (0, 0)
        };

        CacheStats {
            enabled: self.config.enabled,
            key_count,
            memory_used,
            ttl_secs: self.config.ttl_secs,
            max_entry_bytes: self.config.max_entry_bytes,
            key_prefix: self.config.key_prefix.clone(),
        }
    }
}

impl std::fmt::Debug for ExportCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Serializes options with object keys in sorted order.
fn key_segment(collection_id: &str) -> Cow<'_, str> {
    if collection_id.contains([':', '%']) {
        Cow::Owned(collection_id.replace('%', "%25").replace(':', "%3A"))
    } else {
        Cow::Borrowed(collection_id)
    }
}

fn canonical_options(options: &ExportOptions) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(options)?;
    serde_json::to_string(&value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::test_support::MapStore;

    use apidock_domain::OutputEncoding;
    use pretty_assertions::assert_eq;

    fn cache_with(store: Arc<MapStore>) -> ExportCache {
        ExportCache::new(store, CacheConfig::default())
    }

    fn result(content: &str) -> ExportResult {
        ExportResult::new(
            content.to_string(),
            ExportFormat::Postman,
            OutputEncoding::Json,
            "Test Collection",
        )
    }

    #[test]
    fn test_key_shape_and_stability() {
        let cache = cache_with(Arc::new(MapStore::default()));
        let options = ExportOptions::new(ExportFormat::OpenApi);

        let key = cache.generate_key("c1", ExportFormat::OpenApi, &options);
        assert_eq!(key, cache.generate_key("c1", ExportFormat::OpenApi, &options.clone()));

        let parts: Vec<&str> = key.split(':').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(&parts[..3], &["export", "c1", "openapi"]);
        assert_eq!(parts[3].len(), DIGEST_BYTES * 2);
    }

    #[test]
    fn test_key_changes_with_any_input() {
        let cache = cache_with(Arc::new(MapStore::default()));
        let options = ExportOptions::new(ExportFormat::OpenApi);
        let base = cache.generate_key("c1", ExportFormat::OpenApi, &options);

        assert_ne!(base, cache.generate_key("c2", ExportFormat::OpenApi, &options));
        assert_ne!(base, cache.generate_key("c1", ExportFormat::Swagger, &options));

        let variants = [
            options.clone().with_encoding(OutputEncoding::Yaml),
            options.clone().with_environment("env1"),
            options.clone().with_spec_version("3.1.0"),
            ExportOptions {
                include_tests: false,
                ..options.clone()
            },
            ExportOptions {
                include_security: false,
                ..options.clone()
            },
        ];
        for variant in &variants {
            assert_ne!(base, cache.generate_key("c1", ExportFormat::OpenApi, variant));
        }
    }

    #[test]
    fn test_disabled_cache_yields_empty_key() {
        let cache = ExportCache::new(Arc::new(MapStore::default()), CacheConfig::disabled());
        let key = cache.generate_key("c1", ExportFormat::Postman, &ExportOptions::default());
        assert!(key.is_empty());
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = cache_with(Arc::new(MapStore::default()));
        let stored = result("{\"a\":1}");

        cache.set("export:c1:postman:abc", &stored).await.unwrap();
        let loaded = cache.get("export:c1:postman:abc").await.unwrap();

        assert_eq!(loaded, stored);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_deleted() {
        let store = Arc::new(MapStore::default());
        store
            .entries
            .lock()
            .insert("export:c1:postman:bad".into(), "not json".into());
        let cache = cache_with(Arc::clone(&store));

        assert!(cache.get("export:c1:postman:bad").await.is_none());
        assert!(store.entries.lock().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_entry_rejected() {
        let store = Arc::new(MapStore::default());
        let cache = ExportCache::new(
            Arc::clone(&store) as Arc<dyn CacheStore>,
            CacheConfig {
                max_entry_bytes: 64,
                ..CacheConfig::default()
            },
        );

        let error = cache
            .set("export:c1:postman:big", &result(&"x".repeat(200)))
            .await
            .unwrap_err();

        assert!(matches!(error, CacheError::EntryTooLarge { max: 64, .. }));
        assert!(store.entries.lock().is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_reads_as_miss() {
        let cache = cache_with(Arc::new(MapStore::failing()));

        assert!(cache.get("export:c1:postman:x").await.is_none());
        let error = cache.set("export:c1:postman:x", &result("{}")).await.unwrap_err();
        assert!(matches!(ExportError::from(error), ExportError::CacheUnavailable(_)));

        let stats = cache.stats().await;
        assert_eq!(stats.key_count, 0);
        assert_eq!(stats.memory_used, 0);
    }

    #[tokio::test]
    async fn test_invalidation_scope() {
        let store = Arc::new(MapStore::default());
        let cache = cache_with(Arc::clone(&store));
        let options = ExportOptions::default();

        let k1 = cache.generate_key("c1", ExportFormat::Postman, &options);
        let k2 = cache.generate_key("c1", ExportFormat::Swagger, &options);
        let k3 = cache.generate_key("c10", ExportFormat::Postman, &options);
        for key in [&k1, &k2, &k3] {
            cache.set(key, &result("{}")).await.unwrap();
        }

        assert_eq!(
            cache
                .invalidate_collection_format("c1", ExportFormat::Swagger)
                .await
                .unwrap(),
            1
        );
        assert!(cache.get(&k1).await.is_some());
        assert!(cache.get(&k2).await.is_none());

        assert_eq!(cache.invalidate_collection("c1").await.unwrap(), 1);
        assert!(cache.get(&k1).await.is_none());
        assert!(cache.get(&k3).await.is_some());

        assert_eq!(cache.invalidate_collection("unknown").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_colon_in_collection_id_does_not_widen_invalidation() {
        let store = Arc::new(MapStore::default());
        let cache = cache_with(Arc::clone(&store));
        let options = ExportOptions::default();

        let plain = cache.generate_key("a", ExportFormat::Postman, &options);
        let nested = cache.generate_key("a:postman", ExportFormat::Postman, &options);
        assert!(nested.starts_with("export:a%3Apostman:postman:"));
        for key in [&plain, &nested] {
            cache.set(key, &result("{}")).await.unwrap();
        }

        assert_eq!(cache.invalidate_collection("a").await.unwrap(), 1);
        assert!(cache.get(&nested).await.is_some());
        assert_eq!(
            cache
                .invalidate_collection_format("a:postman", ExportFormat::Postman)
                .await
                .unwrap(),
            1
        );
        assert!(store.entries.lock().is_empty());
    }

    #[tokio::test]
    async fn test_stats() {
        let cache = cache_with(Arc::new(MapStore::default()));
        cache.set("export:c1:postman:x", &result("{}")).await.unwrap();

        let stats = cache.stats().await;
        assert!(stats.enabled);
        assert_eq!(stats.key_count, 1);
        assert!(stats.memory_used > 0);
        assert_eq!(stats.ttl_secs, 3600);
        assert_eq!(stats.key_prefix, "export");
    }
}
