//! Exporter registry
//!
//! Maps each format to the exporter that produces it. The registry is an
//! ordinary value handed to the [`ExportManager`](crate::ExportManager).

use std::collections::HashMap;
use std::sync::Arc;

use apidock_domain::ExportFormat;

use crate::error::{ExportError, PipelineResult};
use crate::ports::Exporter;

/// Format to exporter table.
#[derive(Clone, Default)]
pub struct ExporterRegistry {
    exporters: HashMap<ExportFormat, Arc<dyn Exporter>>,
}

impl ExporterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `exporter` for every format it supports, replacing any
    /// previous registration.
    pub fn register(&mut self, exporter: Arc<dyn Exporter>) {
        for format in exporter.supported_formats() {
            self.exporters.insert(format, Arc::clone(&exporter));
        }
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, exporter: Arc<dyn Exporter>) -> Self {
        self.register(exporter);
        self
    }

    /// Resolves the exporter for `format`.
    ///
    /// # Errors
    /// Returns `ExportError::UnsupportedFormat` when nothing is registered.
    pub fn get(&self, format: ExportFormat) -> PipelineResult<Arc<dyn Exporter>> {
        self.exporters
            .get(&format)
            .cloned()
            .ok_or_else(|| ExportError::UnsupportedFormat(format.to_string()))
    }

    /// Registered formats in canonical order.
    #[must_use]
    pub fn formats(&self) -> Vec<ExportFormat> {
        ExportFormat::all()
            .iter()
            .copied()
            .filter(|f| self.exporters.contains_key(f))
            .collect()
    }
}

impl std::fmt::Debug for ExporterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExporterRegistry")
            .field("formats", &self.formats())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use apidock_domain::{Document, ExportOptions, ExportResult};
    use pretty_assertions::assert_eq;

    struct Fixed(ExportFormat);

    impl Exporter for Fixed {
        fn format(&self) -> ExportFormat {
            self.0
        }

        fn export(&self, document: &Document, options: &ExportOptions) -> PipelineResult<ExportResult> {
            Ok(ExportResult::new(
                String::new(),
                self.0,
                options.effective_encoding(),
                &document.collection.name,
            ))
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = ExporterRegistry::new()
            .with(Arc::new(Fixed(ExportFormat::Swagger)))
            .with(Arc::new(Fixed(ExportFormat::Postman)));

        assert_eq!(
            registry.formats(),
            vec![ExportFormat::Postman, ExportFormat::Swagger]
        );
        assert_eq!(registry.get(ExportFormat::Swagger).unwrap().format(), ExportFormat::Swagger);
        assert!(matches!(
            registry.get(ExportFormat::Apidog),
            Err(ExportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_default_option_validation() {
        let exporter = Fixed(ExportFormat::Postman);
        assert!(exporter.validate_options(Some(&ExportOptions::new(ExportFormat::Postman))).is_ok());
        assert!(matches!(
            exporter.validate_options(Some(&ExportOptions::new(ExportFormat::OpenApi))),
            Err(ExportError::OptionsInvalid(_))
        ));
        assert!(matches!(
            exporter.validate_options(None),
            Err(ExportError::OptionsInvalid(_))
        ));
    }
}
