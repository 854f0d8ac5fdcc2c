//! Apidock Domain - Core export types
//!
//! This crate defines the read-only document model handed to the export
//! pipeline and the value objects the pipeline returns.
//! All types here are pure Rust with no I/O dependencies.

pub mod document;
pub mod error;
pub mod export;
pub mod id;
pub mod method;
pub mod progress;

pub use document::{
    Collection, Document, DocumentTree, Endpoint, Environment, EnvironmentVariable, Folder,
    Header, HeaderType, Parameter, ParameterType, RequestBody, Response, ScriptKind, Tag, Test,
};
pub use error::{DomainError, DomainResult};
pub use export::{
    ExportFormat, ExportOptions, ExportResult, OutputEncoding, export_filename, sanitize_filename,
};
pub use id::generate_id;
pub use method::HttpMethod;
pub use progress::{ExportProgress, ExportStatus};
