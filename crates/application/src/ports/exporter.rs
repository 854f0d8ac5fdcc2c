//! Exporter port
//!
//! Defines the contract every output format implements.

use apidock_domain::{Document, ExportFormat, ExportOptions, ExportResult};

use crate::error::{ExportError, PipelineResult};

/// A strategy turning a [`Document`] into one wire format.
///
/// Implementations are pure: the output depends only on the document and
/// the options, and no I/O happens during [`export`](Self::export).
pub trait Exporter: Send + Sync {
    /// The format this exporter produces.
    fn format(&self) -> ExportFormat;

    /// Formats this exporter can produce.
    fn supported_formats(&self) -> Vec<ExportFormat> {
        vec![self.format()]
    }

    /// Checks that options are present and target this exporter.
    ///
    /// # Errors
    /// Returns `ExportError::OptionsInvalid` when options are missing or
    /// name another format.
    fn validate_options(&self, options: Option<&ExportOptions>) -> PipelineResult<()> {
        let options = options
            .ok_or_else(|| ExportError::OptionsInvalid("export options are required".into()))?;

        if options.format == self.format() {
            Ok(())
        } else {
            Err(ExportError::OptionsInvalid(format!(
                "{} exporter cannot produce {}",
                self.format(),
                options.format
            )))
        }
    }

    /// Renders the document.
    ///
    /// # Errors
    /// Returns `ExportError::Serialization` when the final encoding fails.
    fn export(&self, document: &Document, options: &ExportOptions) -> PipelineResult<ExportResult>;
}
