//! Apidock Infrastructure - Exporters and runtime wiring
//!
//! This crate provides the concrete exporters, the in-memory cache store
//! and the configuration and logging setup used by the binary.

pub mod cache;
pub mod config;
pub mod export;
pub mod logging;
pub mod serialization;

use std::sync::Arc;

use apidock_application::{
    CacheStore, ConcurrencyController, ExportCache, ExportManager, PipelineConfig,
};

pub use cache::{DEFAULT_MAX_ENTRIES, MemoryCacheStore};
pub use self::config::{ConfigError, ENV_PREFIX, load_config};
pub use export::{
    ApidogExporter, InsomniaExporter, OpenApiExporter, PostmanExporter, SwaggerExporter,
    default_registry,
};
pub use logging::init_tracing;
pub use serialization::{SerializationError, encode_document, from_json, to_json_stable, to_yaml};

/// Builds an [`ExportManager`] with every exporter registered and results
/// cached in `store`.
#[must_use]
pub fn build_manager(config: &PipelineConfig, store: Arc<dyn CacheStore>) -> ExportManager {
    ExportManager::new(
        default_registry(),
        ExportCache::new(store, config.cache.clone()),
        ConcurrencyController::new(config.concurrency.clone()),
    )
}

/// [`build_manager`] over a fresh [`MemoryCacheStore`].
#[must_use]
pub fn build_in_memory_manager(config: &PipelineConfig) -> ExportManager {
    build_manager(config, Arc::new(MemoryCacheStore::default()))
}
