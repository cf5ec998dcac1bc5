//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate host seeds, value ranges and option combinations
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TransportConfig → Result<(), Vec<ValidationError>>

use http::{HeaderName, HeaderValue, Method};
use thiserror::Error;

use crate::adapter::AdapterKind;
use crate::config::hosts::HostParseError;
use crate::config::schema::TransportConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid host: {0}")]
    Host(#[from] HostParseError),

    #[error("no hosts configured")]
    NoHosts,

    #[error("host '{0}' has port 0")]
    ZeroPort(String),

    #[error("retry_on_status contains invalid HTTP status {0}")]
    InvalidStatus(u16),

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),

    #[error("invalid method '{0}' for send_get_body_as")]
    InvalidMethod(String),

    #[error("invalid default header '{0}'")]
    InvalidHeader(String),

    #[error("the hyper adapter cannot reach '{0}' (http only)")]
    UnsupportedScheme(String),
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &TransportConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match config.resolved_hosts() {
        Ok(hosts) if hosts.is_empty() => errors.push(ValidationError::NoHosts),
        Ok(hosts) => {
            for host in hosts {
                if host.port == 0 {
                    errors.push(ValidationError::ZeroPort(host.host.clone()));
                }
                if config.adapter == AdapterKind::Hyper && host.scheme != "http" {
                    errors.push(ValidationError::UnsupportedScheme(format!(
                        "{}://{}:{}",
                        host.scheme, host.host, host.port
                    )));
                }
            }
        }
        Err(e) => errors.push(e.into()),
    }

    for status in &config.retry_on_status {
        if !(100..=599).contains(status) {
            errors.push(ValidationError::InvalidStatus(*status));
        }
    }

    if config.sniffer_timeout_ms == 0 {
        errors.push(ValidationError::NotPositive("sniffer_timeout_ms"));
    }
    if config.request_timeout_ms == Some(0) {
        errors.push(ValidationError::NotPositive("request_timeout_ms"));
    }
    if config.sniff_interval_secs == Some(0) {
        errors.push(ValidationError::NotPositive("sniff_interval_secs"));
    }
    if config.reload_connections.interval() == Some(0) {
        errors.push(ValidationError::NotPositive("reload_connections"));
    }

    if Method::from_bytes(config.send_get_body_as.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidMethod(config.send_get_body_as.clone()));
    }

    for (name, value) in &config.headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err()
            || HeaderValue::from_str(value).is_err()
        {
            errors.push(ValidationError::InvalidHeader(name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
