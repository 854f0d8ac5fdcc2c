//! JSON and YAML writers for export documents.

use apidock_application::{ExportError, PipelineResult};
use apidock_domain::{ExportFormat, OutputEncoding};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Error type for serialization operations.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    /// JSON serialization failed.
    #[error("JSON serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// JSON deserialization failed.
    #[error("JSON deserialization failed: {0}")]
    Deserialize(serde_json::Error),

    /// YAML serialization failed.
    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// UTF-8 encoding error.
    #[error("UTF-8 encoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Serializes a value to pretty JSON with a trailing newline.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_stable<T: Serialize>(value: &T) -> Result<String, SerializationError> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"  ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;

    let mut json = String::from_utf8(buffer)?;
    json.push('\n');
    Ok(json)
}

/// Serializes a value to YAML.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_yaml(value: &impl Serialize) -> Result<String, SerializationError> {
    Ok(serde_yaml::to_string(value)?)
}

/// Encodes an export document, mapping failures to
/// `ExportError::Serialization` for `format`.
///
/// # Errors
///
/// Returns `ExportError::Serialization` if encoding fails.
pub fn encode_document<T: Serialize>(
    value: &T,
    format: ExportFormat,
    encoding: OutputEncoding,
) -> PipelineResult<String> {
    let encoded = match encoding {
        OutputEncoding::Json => to_json_stable(value),
        OutputEncoding::Yaml => to_yaml(value),
    };
    encoded.map_err(|e| ExportError::serialization(format, e))
}

/// Deserializes JSON from a string.
///
/// # Errors
///
/// Returns an error if the JSON is invalid or doesn't match the expected type.
pub fn from_json<T: DeserializeOwned>(json: &str) -> Result<T, SerializationError> {
    serde_json::from_str(json).map_err(SerializationError::Deserialize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_stable_json_layout() {
        let mut map = BTreeMap::new();
        map.insert("zebra", 1);
        map.insert("apple", 2);

        let json = to_json_stable(&map).expect("serialization should work");
        assert_eq!(json, "{\n  \"apple\": 2,\n  \"zebra\": 1\n}\n");
    }

    #[test]
    fn test_encode_yaml() {
        let mut map = BTreeMap::new();
        map.insert("title", "Shop");

        let yaml = encode_document(&map, ExportFormat::OpenApi, OutputEncoding::Yaml)
            .expect("serialization should work");
        assert_eq!(yaml, "title: Shop\n");
    }

    #[test]
    fn test_from_json_rejects_mismatched_shape() {
        let result: Result<BTreeMap<String, String>, _> = from_json(r#"{"name": 1}"#);
        assert!(matches!(result, Err(SerializationError::Deserialize(_))));
    }
}
