//! Export format types.
//!
//! This module provides the value objects exchanged with the export
//! pipeline: the closed set of target formats, per-call options and the
//! rendered result.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Postman Collection v2.1.
    #[default]
    Postman,
    /// `OpenAPI` 3.x specification.
    #[serde(rename = "openapi")]
    OpenApi,
    /// Insomnia export format v4.
    Insomnia,
    /// Swagger 2.0 specification.
    Swagger,
    /// Apidog collection v2.
    Apidog,
}

impl ExportFormat {
    /// Get all available formats.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Postman,
            Self::OpenApi,
            Self::Insomnia,
            Self::Swagger,
            Self::Apidog,
        ]
    }

    /// Wire name of the format, as accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Postman => "postman",
            Self::OpenApi => "openapi",
            Self::Insomnia => "insomnia",
            Self::Swagger => "swagger",
            Self::Apidog => "apidog",
        }
    }

    /// Get the display name for this format.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Postman => "Postman Collection v2.1",
            Self::OpenApi => "OpenAPI 3",
            Self::Insomnia => "Insomnia v4",
            Self::Swagger => "Swagger 2.0",
            Self::Apidog => "Apidog v2",
        }
    }

    /// Get the filename suffix for this format, including the extension.
    #[must_use]
    pub const fn file_suffix(&self, encoding: OutputEncoding) -> &'static str {
        match (self, encoding) {
            (Self::Postman, _) => ".postman_collection.json",
            (Self::OpenApi, OutputEncoding::Json) => ".openapi.json",
            (Self::OpenApi, OutputEncoding::Yaml) => ".openapi.yaml",
            (Self::Insomnia, _) => ".insomnia_collection.json",
            (Self::Swagger, _) => ".swagger.json",
            (Self::Apidog, _) => ".apidog_collection.json",
        }
    }

    /// Get the MIME type for this format.
    ///
    /// Only `OpenAPI` honours the YAML encoding; every other format is JSON.
    #[must_use]
    pub const fn content_type(&self, encoding: OutputEncoding) -> &'static str {
        match (self, encoding) {
            (Self::OpenApi, OutputEncoding::Yaml) => "application/x-yaml",
            _ => "application/json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::UnsupportedFormat(s.to_string()))
    }
}

/// Serialization used for the rendered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputEncoding {
    /// JSON output.
    #[default]
    Json,
    /// YAML output, `OpenAPI` only.
    Yaml,
}

impl FromStr for OutputEncoding {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(DomainError::UnsupportedEncoding(other.to_string())),
        }
    }
}

/// Export options.
///
/// Field order is significant: it is the canonical order used when the
/// options are hashed into a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// The format to export to.
    #[serde(default)]
    pub format: ExportFormat,
    /// Environment whose variables are substituted. Falls back to the
    /// default environment when unset.
    #[serde(default)]
    pub environment_id: Option<String>,
    /// Whether to include test scripts.
    #[serde(default = "default_true")]
    pub include_tests: bool,
    /// Whether to include request and response examples.
    #[serde(default = "default_true")]
    pub include_examples: bool,
    /// Whether to include pre-request scripts.
    #[serde(default = "default_true")]
    pub include_pre_request_scripts: bool,
    /// Whether to declare servers.
    #[serde(default = "default_true")]
    pub include_servers: bool,
    /// Whether to declare the bearer security scheme.
    #[serde(default = "default_true")]
    pub include_security: bool,
    /// Output encoding, only honoured by `OpenAPI`.
    #[serde(default)]
    pub output_format: OutputEncoding,
    /// Target specification version, e.g. `3.1.0` for `OpenAPI`.
    #[serde(default)]
    pub spec_version: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::default(),
            environment_id: None,
            include_tests: true,
            include_examples: true,
            include_pre_request_scripts: true,
            include_servers: true,
            include_security: true,
            output_format: OutputEncoding::default(),
            spec_version: None,
        }
    }
}

const fn default_true() -> bool {
    true
}

impl ExportOptions {
    /// Create new export options.
    #[must_use]
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    /// Select the environment used for substitution.
    #[must_use]
    pub fn with_environment(mut self, environment_id: impl Into<String>) -> Self {
        self.environment_id = Some(environment_id.into());
        self
    }

    /// Set the output encoding.
    #[must_use]
    pub const fn with_encoding(mut self, encoding: OutputEncoding) -> Self {
        self.output_format = encoding;
        self
    }

    /// Set the target specification version.
    #[must_use]
    pub fn with_spec_version(mut self, version: impl Into<String>) -> Self {
        self.spec_version = Some(version.into());
        self
    }

    /// Encoding actually used for this format.
    #[must_use]
    pub fn effective_encoding(&self) -> OutputEncoding {
        match self.format {
            ExportFormat::OpenApi => self.output_format,
            _ => OutputEncoding::Json,
        }
    }
}

/// Result of an export operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportResult {
    /// The exported content.
    pub content: String,
    /// MIME type of the content.
    pub content_type: String,
    /// Suggested download filename.
    pub filename: String,
    /// Size of the content in bytes.
    pub size: usize,
    /// When the content was generated.
    pub generated_at: DateTime<Utc>,
    /// The format used.
    pub format: ExportFormat,
}

impl ExportResult {
    /// Create a new export result named after `collection_name`.
    #[must_use]
    pub fn new(
        content: String,
        format: ExportFormat,
        encoding: OutputEncoding,
        collection_name: &str,
    ) -> Self {
        Self {
            size: content.len(),
            content,
            content_type: format.content_type(encoding).to_string(),
            filename: export_filename(collection_name, format, encoding),
            generated_at: Utc::now(),
            format,
        }
    }
}

/// Builds the download filename for a collection.
#[must_use]
pub fn export_filename(collection_name: &str, format: ExportFormat, encoding: OutputEncoding) -> String {
    format!(
        "{}{}",
        sanitize_filename(collection_name),
        format.file_suffix(encoding)
    )
}

/// Lower-cases, maps spaces to underscores and drops anything outside
/// `[a-z0-9_-]`. Falls back to `collection` when nothing is left.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .to_lowercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | '_' | '-'))
        .collect();

    if sanitized.is_empty() {
        "collection".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_export_format_all() {
        let formats = ExportFormat::all();
        assert_eq!(formats.len(), 5);
        assert!(formats.contains(&ExportFormat::Swagger));
        assert!(formats.contains(&ExportFormat::Apidog));
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!("postman".parse::<ExportFormat>().unwrap(), ExportFormat::Postman);
        assert_eq!("OpenAPI".parse::<ExportFormat>().unwrap(), ExportFormat::OpenApi);
        assert_eq!(
            "har".parse::<ExportFormat>(),
            Err(DomainError::UnsupportedFormat("har".to_string()))
        );
    }

    #[test]
    fn test_export_format_serde_names() {
        let json = serde_json::to_string(&ExportFormat::OpenApi).unwrap();
        assert_eq!(json, "\"openapi\"");
        let parsed: ExportFormat = serde_json::from_str("\"swagger\"").unwrap();
        assert_eq!(parsed, ExportFormat::Swagger);
    }

    #[test]
    fn test_content_type_and_suffix() {
        assert_eq!(
            ExportFormat::OpenApi.content_type(OutputEncoding::Yaml),
            "application/x-yaml"
        );
        assert_eq!(
            ExportFormat::Swagger.content_type(OutputEncoding::Yaml),
            "application/json"
        );
        assert_eq!(
            ExportFormat::OpenApi.file_suffix(OutputEncoding::Yaml),
            ".openapi.yaml"
        );
        assert_eq!(
            ExportFormat::Insomnia.file_suffix(OutputEncoding::Json),
            ".insomnia_collection.json"
        );
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Test Collection"), "test_collection");
        assert_eq!(sanitize_filename("My-API (v2)!"), "my-api_v2");
        assert_eq!(sanitize_filename("Ünïcødé"), "ncd");
        assert_eq!(sanitize_filename("!!!"), "collection");
        assert_eq!(sanitize_filename(""), "collection");
    }

    #[test]
    fn test_export_result_metadata() {
        let result = ExportResult::new(
            "{}".to_string(),
            ExportFormat::Postman,
            OutputEncoding::Json,
            "Test Collection",
        );

        assert_eq!(result.filename, "test_collection.postman_collection.json");
        assert_eq!(result.content_type, "application/json");
        assert_eq!(result.size, 2);
    }

    #[test]
    fn test_effective_encoding_only_for_openapi() {
        let yaml = ExportOptions::new(ExportFormat::OpenApi).with_encoding(OutputEncoding::Yaml);
        assert_eq!(yaml.effective_encoding(), OutputEncoding::Yaml);

        let swagger = ExportOptions::new(ExportFormat::Swagger).with_encoding(OutputEncoding::Yaml);
        assert_eq!(swagger.effective_encoding(), OutputEncoding::Json);
    }

    #[test]
    fn test_export_options_defaults_from_empty_json() {
        let options: ExportOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, ExportOptions::default());
    }
}
