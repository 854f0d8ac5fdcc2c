//! Domain error types

use thiserror::Error;

/// Domain-level errors raised while parsing or validating document values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The HTTP method is not supported.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// The export format name is not one of the supported formats.
    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),

    /// The output encoding name is not recognised.
    #[error("unsupported output encoding: {0}")]
    UnsupportedEncoding(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
