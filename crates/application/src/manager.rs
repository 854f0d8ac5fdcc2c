//! Export manager
//!
//! Public entry point of the pipeline. A call parses the format, consults
//! the cache, resolves the exporter, runs it under the concurrency
//! controller and stores the result.

use std::collections::HashMap;
use std::sync::Arc;

use apidock_domain::{Document, ExportFormat, ExportOptions, ExportProgress, ExportResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::cache::{CacheStats, ExportCache};
use crate::concurrency::{ConcurrencyController, PerformanceStats};
use crate::error::{ExportError, PipelineResult};
use crate::registry::ExporterRegistry;

/// Facade over the registry, the cache and the concurrency controller.
#[derive(Debug, Clone)]
pub struct ExportManager {
    registry: ExporterRegistry,
    cache: ExportCache,
    controller: ConcurrencyController,
}

impl ExportManager {
    /// Wires the pipeline together.
    #[must_use]
    pub const fn new(
        registry: ExporterRegistry,
        cache: ExportCache,
        controller: ConcurrencyController,
    ) -> Self {
        Self {
            registry,
            cache,
            controller,
        }
    }

    /// Exports `document` to the format named by `format`.
    ///
    /// `format` is matched case-insensitively. Missing options default to
    /// the format's defaults, and the options' own format is forced to the
    /// requested one. An already-cancelled `cancel` fails before the cache
    /// is consulted. Cache hits return without touching the controller.
    /// A failed cache write is logged and does not fail the export.
    ///
    /// # Errors
    /// - `ExportError::UnsupportedFormat` for an unknown format name.
    /// - `ExportError::OptionsInvalid` when the exporter rejects the options.
    /// - `ExportError::Cancelled` and `ExportError::Timeout` from the
    ///   controller, plus anything the exporter returns.
    #[instrument(skip_all, fields(collection_id = %document.collection.id, format))]
    pub async fn export(
        &self,
        document: Arc<Document>,
        format: &str,
        options: Option<ExportOptions>,
        cancel: &CancellationToken,
    ) -> PipelineResult<ExportResult> {
        let format: ExportFormat = format.parse()?;
        tracing::Span::current().record("format", format.as_str());

        let mut options = options.unwrap_or_else(|| ExportOptions::new(format));
        options.format = format;

        if cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }

        let collection_id = document.collection.id.clone();
        let key = self.cache.generate_key(&collection_id, format, &options);
        if let Some(hit) = self.cache.get(&key).await {
            debug!("served from cache");
            return Ok(hit);
        }

        let exporter = self.registry.get(format)?;
        exporter.validate_options(Some(&options))?;

        let result = self
            .controller
            .run(exporter, document, options, cancel)
            .await?;

        if let Err(error) = self.cache.set(&key, &result).await {
            warn!(%error, cache_key = key, "failed to cache export result");
        }

        Ok(result)
    }

    /// Drops every cached export of `collection_id`.
    ///
    /// # Errors
    /// Returns `ExportError::CacheUnavailable` when the backend fails.
    pub async fn invalidate_cache(&self, collection_id: &str) -> PipelineResult<usize> {
        Ok(self.cache.invalidate_collection(collection_id).await?)
    }

    /// Drops cached exports of `collection_id` in one format.
    ///
    /// # Errors
    /// Returns `ExportError::UnsupportedFormat` for an unknown format name,
    /// or `ExportError::CacheUnavailable` when the backend fails.
    pub async fn invalidate_cache_format(
        &self,
        collection_id: &str,
        format: &str,
    ) -> PipelineResult<usize> {
        let format: ExportFormat = format.parse()?;
        Ok(self
            .cache
            .invalidate_collection_format(collection_id, format)
            .await?)
    }

    /// Formats with a registered exporter.
    #[must_use]
    pub fn supported_formats(&self) -> Vec<ExportFormat> {
        self.registry.formats()
    }

    /// Cache configuration and occupancy.
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Controller counters.
    #[must_use]
    pub fn performance_stats(&self) -> PerformanceStats {
        self.controller.stats()
    }

    /// Copy of one progress record.
    #[must_use]
    pub fn get_progress(&self, progress_id: &str) -> Option<ExportProgress> {
        self.controller.get_progress(progress_id)
    }

    /// Copy of every tracked progress record.
    #[must_use]
    pub fn get_all_progress(&self) -> HashMap<String, ExportProgress> {
        self.controller.get_all_progress()
    }

    /// The controller, for starting the background sweeper.
    #[must_use]
    pub const fn controller(&self) -> &ConcurrencyController {
        &self.controller
    }
}
