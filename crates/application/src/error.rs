//! Application error types

use std::time::Duration;

use apidock_domain::{DomainError, ExportFormat};
use thiserror::Error;

/// Errors surfaced by the export pipeline.
///
/// Variants split into bad input ([`is_client_error`](Self::is_client_error))
/// and transient infrastructure failures
/// ([`is_retryable`](Self::is_retryable)), so callers can decide whether to
/// try again.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Options are missing or do not match the exporter.
    #[error("invalid export options: {0}")]
    OptionsInvalid(String),

    /// The requested format is not one of the supported formats.
    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),

    /// The document was transformed but could not be encoded.
    #[error("failed to serialize {format} export: {message}")]
    Serialization {
        /// Format being produced.
        format: ExportFormat,
        /// Underlying encoder error.
        message: String,
    },

    /// The cache backend could not be reached.
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    /// The export did not finish within the configured deadline.
    #[error("export timed out after {0:?}")]
    Timeout(Duration),

    /// The caller cancelled the export.
    #[error("export cancelled")]
    Cancelled,

    /// The worker running the transform failed unexpectedly.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ExportError {
    /// Creates a serialization error for `format`.
    pub fn serialization(format: ExportFormat, error: impl std::fmt::Display) -> Self {
        Self::Serialization {
            format,
            message: error.to_string(),
        }
    }

    /// Whether the failure is caused by the caller's input.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::OptionsInvalid(_) | Self::UnsupportedFormat(_))
    }

    /// Whether retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CacheUnavailable(_) | Self::Timeout(_) | Self::Internal(_)
        )
    }
}

impl From<DomainError> for ExportError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::UnsupportedFormat(name) => Self::UnsupportedFormat(name),
            other => Self::OptionsInvalid(other.to_string()),
        }
    }
}

/// Result type alias for export operations.
pub type PipelineResult<T> = Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(ExportError::OptionsInvalid("x".into()).is_client_error());
        assert!(ExportError::UnsupportedFormat("har".into()).is_client_error());
        assert!(!ExportError::Cancelled.is_client_error());

        assert!(ExportError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(ExportError::CacheUnavailable("down".into()).is_retryable());
        assert!(!ExportError::Cancelled.is_retryable());
        assert!(!ExportError::serialization(ExportFormat::OpenApi, "bad").is_retryable());
    }

    #[test]
    fn test_domain_error_conversion() {
        let error: ExportError = DomainError::UnsupportedFormat("har".into()).into();
        assert!(matches!(error, ExportError::UnsupportedFormat(name) if name == "har"));

        let error: ExportError = DomainError::UnsupportedEncoding("xml".into()).into();
        assert!(matches!(error, ExportError::OptionsInvalid(_)));
    }

    #[test]
    fn test_serialization_message() {
        let error = ExportError::serialization(ExportFormat::OpenApi, "bad float");
        assert_eq!(error.to_string(), "failed to serialize openapi export: bad float");
    }
}
