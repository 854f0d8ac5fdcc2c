//! Pipeline configuration loading.
//!
//! Precedence, lowest first: built-in defaults, the optional config file
//! (TOML, YAML or JSON by extension), then `APIDOCK__*` environment
//! variables such as `APIDOCK__CACHE__TTL_SECS=60`.

use std::collections::HashMap;
use std::path::Path;

use apidock_application::PipelineConfig;
use config::{Config, Environment, File};
use thiserror::Error;

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "APIDOCK";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or parsed.
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),

    /// A value is out of range.
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid {
        /// Dotted key of the offending value.
        key: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Loads the pipeline configuration from `path` and the process
/// environment.
///
/// # Errors
/// Returns `ConfigError` when the file is missing or malformed, or a value
/// fails validation.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    load_with_env(path, None)
}

fn load_with_env(
    path: Option<&Path>,
    env: Option<HashMap<String, String>>,
) -> Result<PipelineConfig, ConfigError> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .source(env),
    );

    let config: PipelineConfig = builder.build()?.try_deserialize()?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.concurrency.max_concurrent_exports == 0 {
        return Err(ConfigError::invalid(
            "concurrency.max_concurrent_exports",
            "must be at least 1",
        ));
    }
    if config.concurrency.streaming_batch_size == 0 {
        return Err(ConfigError::invalid(
            "concurrency.streaming_batch_size",
            "must be at least 1",
        ));
    }
    if config.concurrency.export_timeout_ms == 0 {
        return Err(ConfigError::invalid(
            "concurrency.export_timeout_ms",
            "must be greater than zero",
        ));
    }
    if config.cache.key_prefix.contains(':') {
        return Err(ConfigError::invalid(
            "cache.key_prefix",
            "must not contain ':'",
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = load_with_env(None, Some(HashMap::new())).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        let file = write_file(
            ".toml",
            "[cache]\nttl_secs = 60\n\n[concurrency]\nmax_concurrent_exports = 2\n",
        );
        let config = load_with_env(Some(file.path()), Some(HashMap::new())).unwrap();

        assert_eq!(config.cache.ttl_secs, 60);
        assert!(config.cache.enabled);
        assert_eq!(config.concurrency.max_concurrent_exports, 2);
        assert_eq!(config.concurrency.streaming_threshold, 100);
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = write_file(".yaml", "cache:\n  enabled: true\n  ttl_secs: 60\n");
        let env = HashMap::from([
            ("APIDOCK__CACHE__ENABLED".to_string(), "false".to_string()),
            ("APIDOCK__CONCURRENCY__STREAMING_THRESHOLD".to_string(), "10".to_string()),
        ]);
        let config = load_with_env(Some(file.path()), Some(env)).unwrap();

        assert!(!config.cache.enabled);
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.concurrency.streaming_threshold, 10);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_with_env(Some(&dir.path().join("absent.toml")), Some(HashMap::new()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Build(_)));
    }

    #[test]
    fn test_rejects_zero_slots() {
        let file = write_file(".json", r#"{"concurrency": {"max_concurrent_exports": 0}}"#);
        let err = load_with_env(Some(file.path()), Some(HashMap::new())).unwrap_err();

        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "concurrency.max_concurrent_exports",
                ..
            }
        ));
    }
}
