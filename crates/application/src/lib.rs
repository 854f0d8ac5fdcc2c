//! Apidock Application - Export pipeline orchestration
//!
//! This crate ties the document model to the exporters: it defines the
//! ports adapters implement, derives cache keys, bounds concurrent work
//! and exposes the [`ExportManager`] facade.

pub mod cache;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod manager;
pub mod ports;
pub mod registry;
pub mod variable_resolver;

#[cfg(test)]
mod test_support;

pub use cache::{CacheError, CacheStats, ExportCache};
pub use concurrency::{ConcurrencyController, PerformanceStats};
pub use config::{CacheConfig, ConcurrencyConfig, PipelineConfig};
pub use error::{ExportError, PipelineResult};
pub use manager::ExportManager;
pub use ports::{CacheStore, CacheStoreError, Exporter};
pub use registry::ExporterRegistry;
pub use variable_resolver::{ResolutionResult, VariableResolver};
