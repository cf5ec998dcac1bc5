//! Cluster topology discovery.
//!
//! # Responsibilities
//! - Ask a seed node for the current node list (`GET _nodes/http`)
//! - Parse publish addresses into host entries
//! - Bound the whole exchange by the sniffer timeout
//!
//! # Design Decisions
//! - Seeds are tried in order until one answers; the first answer wins
//! - Discovered nodes inherit scheme and credentials from the seed
//! - An empty node list is an error, so sniffing can never empty the pool
//!
//! # Payload
//! ```text
//! { "nodes": { "<id>": { "http": { "publish_address": "10.0.0.1:9200" } }, ... } }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use http::{header::AUTHORIZATION, Method, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tokio::time;

use crate::adapter::{Adapter, AdapterError, AdapterRequest};
use crate::config::hosts::HostConfig;
use crate::pool::Connection;

/// Discovery endpoint queried on the seed node.
pub const SNIFF_PATH: &str = "_nodes/http";

/// Errors from a sniff. Never fatal to user requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SniffError {
    #[error("no connection available to sniff from")]
    NoSeed,

    #[error("sniff timed out after {0:?}")]
    Timeout(Duration),

    #[error("sniff request to {host} failed: {source}")]
    Request { host: String, source: AdapterError },

    #[error("sniff request to {host} returned {status}")]
    Status { host: String, status: StatusCode },

    #[error("malformed node info: {0}")]
    Parse(String),

    #[error("invalid publish address '{0}'")]
    InvalidAddress(String),

    #[error("cluster reported no http nodes")]
    Empty,

    #[error("a sniff is already in progress")]
    InProgress,
}

/// Nodes reported by a discovery request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SniffResult {
    pub nodes: Vec<HostConfig>,
}

#[derive(Debug, Deserialize)]
struct NodesInfo {
    #[serde(default)]
    nodes: BTreeMap<String, NodeInfo>,
}

#[derive(Debug, Deserialize)]
struct NodeInfo {
    http: Option<HttpInfo>,
}

#[derive(Debug, Deserialize)]
struct HttpInfo {
    publish_address: String,
}

/// Issues discovery requests.
#[derive(Debug, Clone)]
pub struct Sniffer {
    timeout: Duration,
}

impl Sniffer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Query `seeds` in order until one returns a node list.
    pub async fn sniff(
        &self,
        seeds: &[Arc<Connection>],
        adapter: &dyn Adapter,
    ) -> Result<SniffResult, SniffError> {
        if seeds.is_empty() {
            return Err(SniffError::NoSeed);
        }

        let attempt = async {
            let mut last_error = SniffError::NoSeed;
            for seed in seeds {
                let mut request = AdapterRequest::new(Method::GET, seed.url(SNIFF_PATH, &[]));
                request.timeout = Some(self.timeout);
                if let Some(auth) = seed.authorization() {
                    request.headers.insert(AUTHORIZATION, auth);
                }

                match adapter.execute(request).await {
                    Ok(response) if response.is_success() => {
                        return parse_nodes(&response.body, seed);
                    }
                    Ok(response) => {
                        tracing::warn!(host = %seed, status = %response.status, "Sniff rejected by seed");
                        last_error = SniffError::Status {
                            host: seed.to_string(),
                            status: response.status,
                        };
                    }
                    Err(e) => {
                        tracing::warn!(host = %seed, error = %e, "Sniff request failed, trying next seed");
                        last_error = SniffError::Request {
                            host: seed.to_string(),
                            source: e,
                        };
                    }
                }
            }
            Err(last_error)
        };

        match time::timeout(self.timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(SniffError::Timeout(self.timeout)),
        }
    }
}

/// Parse a `_nodes/http` payload. Nodes without an http section are skipped.
pub fn parse_nodes(body: &[u8], seed: &Connection) -> Result<SniffResult, SniffError> {
    let info: NodesInfo =
        serde_json::from_slice(body).map_err(|e| SniffError::Parse(e.to_string()))?;

    let mut nodes = Vec::with_capacity(info.nodes.len());
    for (id, node) in info.nodes {
        let Some(http) = node.http else {
            tracing::debug!(node = %id, "Skipping node without http publish address");
            continue;
        };
        let (host, port) = parse_publish_address(&http.publish_address)?;
        nodes.push(HostConfig {
            scheme: seed.scheme().to_string(),
            host,
            port,
            path: String::new(),
            user: seed.user().map(str::to_string),
            password: seed.password().map(str::to_string),
            weight: 1,
        });
    }

    if nodes.is_empty() {
        return Err(SniffError::Empty);
    }
    Ok(SniffResult { nodes })
}

/// Parse `host:port`, `hostname/ip:port` or `[ipv6]:port`.
pub fn parse_publish_address(address: &str) -> Result<(String, u16), SniffError> {
    let invalid = || SniffError::InvalidAddress(address.to_string());

    // "hostname/ip:port": keep the hostname, take the port from the tail.
    let (name, endpoint) = match address.split_once('/') {
        Some((name, endpoint)) => (Some(name), endpoint),
        None => (None, address),
    };

    let (ip, port) = if let Some(rest) = endpoint.strip_prefix('[') {
        let (ip, port) = rest.split_once("]:").ok_or_else(invalid)?;
        (ip, port)
    } else {
        endpoint.rsplit_once(':').ok_or_else(invalid)?
    };

    let port: u16 = port.parse().map_err(|_| invalid())?;
    let host = name.filter(|n| !n.is_empty()).unwrap_or(ip);
    if host.is_empty() {
        return Err(invalid());
    }
    Ok((host.to_string(), port))
}
