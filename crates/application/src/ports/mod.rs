//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the pipeline core and its
//! collaborators. Exporters and cache backends are implemented by adapters
//! in the infrastructure layer.

mod cache_store;
mod exporter;

pub use cache_store::{CacheStore, CacheStoreError};
pub use exporter::Exporter;
