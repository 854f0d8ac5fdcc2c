//! Pipeline configuration types
//!
//! Plain data with serde defaults; loading from files and the environment
//! lives in the infrastructure layer.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Result cache settings.
    pub cache: CacheConfig,
    /// Concurrency controller settings.
    pub concurrency: ConcurrencyConfig,
}

/// Result cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When false every lookup misses and nothing is stored.
    pub enabled: bool,
    /// Entry lifetime in seconds.
    pub ttl_secs: u64,
    /// Largest serialized entry accepted, in bytes.
    pub max_entry_bytes: usize,
    /// Namespace prepended to every key.
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 3600,
            max_entry_bytes: 10 * 1024 * 1024,
            key_prefix: "export".to_string(),
        }
    }
}

impl CacheConfig {
    /// Entry lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// A configuration with caching switched off.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Concurrency controller settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Number of exports allowed to run at once.
    pub max_concurrent_exports: usize,
    /// Deadline for a whole export, slot wait included, in milliseconds.
    pub export_timeout_ms: u64,
    /// Endpoint count above which the batched path is used.
    pub streaming_threshold: usize,
    /// Endpoints per batch on the batched path.
    pub streaming_batch_size: usize,
    /// Pause between batches, in milliseconds.
    pub batch_pause_ms: u64,
    /// How long terminal progress records stay queryable, in seconds.
    pub progress_retention_secs: u64,
    /// Interval of the background progress sweep, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_exports: 5,
            export_timeout_ms: 300_000,
            streaming_threshold: 100,
            streaming_batch_size: 50,
            batch_pause_ms: 10,
            progress_retention_secs: 300,
            sweep_interval_secs: 60,
        }
    }
}

impl ConcurrencyConfig {
    /// Export deadline.
    #[must_use]
    pub const fn export_timeout(&self) -> Duration {
        Duration::from_millis(self.export_timeout_ms)
    }

    /// Pause between batches.
    #[must_use]
    pub const fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }

    /// Retention window for terminal progress records.
    #[must_use]
    pub const fn progress_retention(&self) -> Duration {
        Duration::from_secs(self.progress_retention_secs)
    }

    /// Background sweep interval, never zero.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}
