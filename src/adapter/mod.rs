//! HTTP execution backends.
//!
//! # Data Flow
//! ```text
//! Transport attempt
//!     → AdapterRequest (method, absolute URL, headers, body, timeout)
//!     → Adapter::execute (reqwest_adapter.rs or hyper_adapter.rs)
//!     → Response (status, headers, raw body) or AdapterError
//! ```
//!
//! # Design Decisions
//! - Adapters own sockets and connection reuse; the core only owns node metadata
//! - One exchange per call; retries belong to the transport
//! - Errors are classified into connect / timeout / request so the transport
//!   can decide retryability without inspecting backend-specific types

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub mod hyper_adapter;
pub mod reqwest_adapter;

pub use hyper_adapter::HyperAdapter;
pub use reqwest_adapter::ReqwestAdapter;

/// Timeout used when neither the transport nor the call set one.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One HTTP exchange to perform.
#[derive(Debug, Clone)]
pub struct AdapterRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl AdapterRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }
}

/// A received HTTP response. The body is left undecoded.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Body as UTF-8 text, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Transport-level failure of a single exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// The node could not be reached.
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The exchange started but broke before a full response arrived.
    #[error("request failed: {0}")]
    Request(String),

    /// The request could not be expressed for this backend.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

/// Executes one HTTP exchange against a node.
#[async_trait]
pub trait Adapter: Send + Sync + Debug {
    async fn execute(&self, request: AdapterRequest) -> Result<Response, AdapterError>;
}

/// Built-in HTTP backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    /// reqwest client (http and https).
    #[default]
    Reqwest,
    /// hyper-util legacy client (plain http only).
    Hyper,
}

impl AdapterKind {
    pub fn name(self) -> &'static str {
        match self {
            AdapterKind::Reqwest => "reqwest",
            AdapterKind::Hyper => "hyper",
        }
    }

    pub fn build(self, default_timeout: Option<Duration>) -> Result<Arc<dyn Adapter>, AdapterError> {
        let timeout = default_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        Ok(match self {
            AdapterKind::Reqwest => Arc::new(ReqwestAdapter::new(timeout)?),
            AdapterKind::Hyper => Arc::new(HyperAdapter::new(timeout)),
        })
    }
}
