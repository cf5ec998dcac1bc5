//! Configuration schema definitions.
//!
//! This module defines the complete configuration surface of the transport.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapter::AdapterKind;
use crate::config::hosts::{
    self, HostConfig, HostEntry, HostParseError, DEFAULT_HOST, HOSTS_ENV_VAR,
};
use crate::pool::ReconcilePolicy;
use crate::resilience::backoff::{BackoffStrategy, ResurrectBackoff};
use crate::resilience::retries::DEFAULT_MAX_RETRIES;
use crate::selector::SelectorKind;
use crate::serializer::SerializerKind;

/// Request count used when `reload_connections = true`.
pub const DEFAULT_RELOAD_AFTER: u64 = 10_000;

/// Root configuration for the transport.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Initial pool seed. Empty means: environment, then `localhost:9200`.
    #[serde(deserialize_with = "hosts::deserialize_hosts")]
    pub hosts: Vec<HostEntry>,

    /// Shuffle the initial pool and every sniffed host list.
    pub randomize_hosts: bool,

    /// Sniff after every N requests.
    pub reload_connections: ReloadConnections,

    /// Sniff after a retryable failure.
    pub reload_on_failure: bool,

    /// Upper bound for a single sniff, in milliseconds.
    pub sniffer_timeout_ms: u64,

    /// Interval of the background sniffer task, if any.
    pub sniff_interval_secs: Option<u64>,

    /// How sniffed topology is merged into the pool.
    pub sniff_policy: ReconcilePolicy,

    /// Base delay before a dead connection may be probed again.
    pub resurrect_after_secs: u64,

    /// Whether the resurrection delay grows with the failure count.
    pub resurrect_backoff: BackoffStrategy,

    /// Cap on the resurrection delay for exponential backoff.
    pub resurrect_max_secs: u64,

    /// Offer resurrect candidates alongside alive connections.
    pub eager_resurrection: bool,

    /// Retry budget: `false`, `true` (3 retries) or a retry count.
    pub retry_on_failure: RetryOnFailure,

    /// Fixed pause between attempts, in milliseconds.
    pub delay_on_retry_ms: u64,

    /// HTTP statuses handled like connection failures.
    pub retry_on_status: Vec<u16>,

    /// Mark a node dead when it answers with a 5xx outside `retry_on_status`.
    pub mark_dead_on_server_error: bool,

    /// Per-attempt timeout in milliseconds. Adapter default when unset.
    pub request_timeout_ms: Option<u64>,

    pub selector: SelectorKind,

    pub adapter: AdapterKind,

    pub serializer: SerializerKind,

    /// Method used for GET requests that carry a body.
    pub send_get_body_as: String,

    /// Headers attached to every request.
    pub headers: BTreeMap<String, String>,

    /// Gzip request bodies and ask nodes for compressed responses.
    pub compression: bool,

    /// Send the client meta header describing this client.
    pub enable_meta_header: bool,

    /// Log level used by the CLI when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            randomize_hosts: false,
            reload_connections: ReloadConnections::Enabled(false),
            reload_on_failure: false,
            sniffer_timeout_ms: 1_000,
            sniff_interval_secs: None,
            sniff_policy: ReconcilePolicy::default(),
            resurrect_after_secs: 60,
            resurrect_backoff: BackoffStrategy::default(),
            resurrect_max_secs: 1_800,
            eager_resurrection: false,
            retry_on_failure: RetryOnFailure::Enabled(false),
            delay_on_retry_ms: 0,
            retry_on_status: Vec::new(),
            mark_dead_on_server_error: false,
            request_timeout_ms: None,
            selector: SelectorKind::default(),
            adapter: AdapterKind::default(),
            serializer: SerializerKind::default(),
            send_get_body_as: "GET".to_string(),
            headers: BTreeMap::new(),
            compression: false,
            enable_meta_header: true,
            log_level: "info".to_string(),
        }
    }
}

impl TransportConfig {
    /// Configuration seeded with the given hosts and defaults elsewhere.
    pub fn with_hosts<I, H>(hosts: I) -> Self
    where
        I: IntoIterator<Item = H>,
        H: Into<HostEntry>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Resolve the pool seed, consulting the environment when no hosts are configured.
    pub fn resolved_hosts(&self) -> Result<Vec<HostConfig>, HostParseError> {
        self.resolve_hosts_from(std::env::var(HOSTS_ENV_VAR).ok())
    }

    pub(crate) fn resolve_hosts_from(
        &self,
        env: Option<String>,
    ) -> Result<Vec<HostConfig>, HostParseError> {
        if self.hosts.is_empty() {
            let fallback = env
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_HOST.to_string());
            return hosts::parse_host_list(&fallback);
        }

        let mut resolved = Vec::new();
        for entry in &self.hosts {
            resolved.extend(entry.resolve()?);
        }
        Ok(resolved)
    }

    pub fn sniffer_timeout(&self) -> Duration {
        Duration::from_millis(self.sniffer_timeout_ms)
    }

    pub fn sniff_interval(&self) -> Option<Duration> {
        self.sniff_interval_secs.map(Duration::from_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn delay_on_retry(&self) -> Duration {
        Duration::from_millis(self.delay_on_retry_ms)
    }

    pub fn resurrect_backoff(&self) -> ResurrectBackoff {
        ResurrectBackoff::new(
            self.resurrect_backoff,
            Duration::from_secs(self.resurrect_after_secs),
            Duration::from_secs(self.resurrect_max_secs),
        )
    }
}

/// `retry_on_failure` accepts a boolean or a retry count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RetryOnFailure {
    Enabled(bool),
    Count(u32),
}

impl RetryOnFailure {
    /// Number of retries after the first attempt.
    pub fn retries(self) -> u32 {
        match self {
            RetryOnFailure::Enabled(true) => DEFAULT_MAX_RETRIES,
            RetryOnFailure::Enabled(false) => 0,
            RetryOnFailure::Count(n) => n,
        }
    }
}

impl Default for RetryOnFailure {
    fn default() -> Self {
        RetryOnFailure::Enabled(false)
    }
}

/// `reload_connections` accepts a boolean or a request count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ReloadConnections {
    Enabled(bool),
    Every(u64),
}

impl ReloadConnections {
    /// Request interval between reloads, if enabled.
    pub fn interval(self) -> Option<u64> {
        match self {
            ReloadConnections::Enabled(true) => Some(DEFAULT_RELOAD_AFTER),
            ReloadConnections::Enabled(false) => None,
            ReloadConnections::Every(n) => Some(n),
        }
    }
}

impl Default for ReloadConnections {
    fn default() -> Self {
        ReloadConnections::Enabled(false)
    }
}
