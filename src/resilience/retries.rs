//! Retry policy and attempt classification.
//!
//! # Responsibilities
//! - Hold the retry budget and delay for a transport
//! - Classify each attempt outcome as success, retryable or fatal
//!
//! # Design Decisions
//! - Connection errors and timeouts are always retryable
//! - Statuses in `retry_on_status` behave exactly like connection errors
//! - 4xx are NOT node failures (client error, not backend)
//! - Plain 5xx are fatal; marking the node dead is a policy switch

use std::collections::HashSet;
use std::time::Duration;

use http::StatusCode;

use crate::config::TransportConfig;

/// Retries used when `retry_on_failure = true`.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Snapshot of retry configuration held by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Fixed pause between attempts.
    pub delay: Duration,
    /// Statuses treated as retryable failures.
    pub retry_on_status: HashSet<u16>,
    /// Sniff after every retryable failure.
    pub reload_on_failure: bool,
    /// Mark nodes dead on 5xx outside `retry_on_status`.
    pub mark_dead_on_server_error: bool,
}

impl RetryPolicy {
    pub fn from_config(config: &TransportConfig) -> Self {
        Self {
            max_retries: config.retry_on_failure.retries(),
            delay: config.delay_on_retry(),
            retry_on_status: config.retry_on_status.iter().copied().collect(),
            reload_on_failure: config.reload_on_failure,
            mark_dead_on_server_error: config.mark_dead_on_server_error,
        }
    }

    /// Total attempts a request may make.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Apply per-call overrides.
    pub fn with_overrides(&self, retries: Option<u32>, extra_statuses: &[u16]) -> Self {
        let mut policy = self.clone();
        if let Some(retries) = retries {
            policy.max_retries = retries;
        }
        policy.retry_on_status.extend(extra_statuses.iter().copied());
        policy
    }

    pub fn classify(&self, status: StatusCode) -> StatusClass {
        classify_status(status, &self.retry_on_status)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&TransportConfig::default())
    }
}

/// What a received HTTP status means for the attempt loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Retryable,
    ClientError,
    ServerError,
}

/// Classify a response status against the configured retry set.
pub fn classify_status(status: StatusCode, retry_on_status: &HashSet<u16>) -> StatusClass {
    if retry_on_status.contains(&status.as_u16()) {
        StatusClass::Retryable
    } else if status.is_server_error() {
        StatusClass::ServerError
    } else if status.as_u16() >= 400 {
        StatusClass::ClientError
    } else {
        StatusClass::Success
    }
}
