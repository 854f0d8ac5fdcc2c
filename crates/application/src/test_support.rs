//! Shared test doubles.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::ports::{CacheStore, CacheStoreError};

/// In-memory store that ignores TTLs and can be switched to fail.
#[derive(Default)]
pub struct MapStore {
    pub entries: Mutex<BTreeMap<String, String>>,
    pub fail: bool,
}

impl MapStore {
    pub fn failing() -> Self {
        Self {
            entries: Mutex::default(),
            fail: true,
        }
    }

    fn check(&self) -> Result<(), CacheStoreError> {
        if self.fail {
            Err(CacheStoreError::Unavailable("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheStore for MapStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError> {
        self.check()?;
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: String, _ttl: Duration) -> Result<(), CacheStoreError> {
        self.check()?;
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheStoreError> {
        self.check()?;
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheStoreError> {
        self.check()?;
        Ok(self
            .entries
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheStoreError> {
        self.check()?;
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        Ok(before - entries.len())
    }

    async fn memory_used(&self) -> Result<u64, CacheStoreError> {
        self.check()?;
        Ok(self.entries.lock().values().map(|v| v.len() as u64).sum())
    }
}
