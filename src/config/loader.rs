//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::adapter::AdapterError;
use crate::config::hosts::HostParseError;
use crate::config::schema::TransportConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("Invalid host: {0}")]
    Host(#[from] HostParseError),

    #[error("HTTP backend setup failed: {0}")]
    Backend(#[from] AdapterError),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<TransportConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<TransportConfig, ConfigError> {
    let config: TransportConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            hosts = ["http://node-a:9200", "node-b:9201"]
            retry_on_failure = 2
            delay_on_retry_ms = 50
            retry_on_status = [503]
            reload_on_failure = true

            [headers]
            x-opaque-id = "nightly-batch"
            "#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.resolved_hosts().unwrap().len(), 2);
        assert_eq!(config.retry_on_failure.retries(), 2);
        assert!(config.reload_on_failure);
        assert_eq!(config.headers.get("x-opaque-id").unwrap(), "nightly-batch");
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = parse_config(r#"hosts = "a:9200"
retry_on_status = [1000]"#)
        .unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors, vec![ValidationError::InvalidStatus(1000)]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_syntax_error() {
        assert!(matches!(parse_config("hosts = ["), Err(ConfigError::Parse(_))));
    }
}
