//! reqwest-backed adapter.

use std::time::Duration;

use async_trait::async_trait;

use crate::adapter::{Adapter, AdapterError, AdapterRequest, Response};

/// Adapter using a shared `reqwest::Client` (connection pooling, TLS).
#[derive(Debug, Clone)]
pub struct ReqwestAdapter {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl ReqwestAdapter {
    pub fn new(default_timeout: Duration) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("cluster-transport/", env!("CARGO_PKG_VERSION")))
            .no_proxy()
            .build()
            .map_err(|e| AdapterError::Request(e.to_string()))?;
        Ok(Self::with_client(client, default_timeout))
    }

    /// Wrap a pre-configured client (custom TLS roots, proxies, ...).
    pub fn with_client(client: reqwest::Client, default_timeout: Duration) -> Self {
        Self {
            client,
            default_timeout,
        }
    }
}

fn classify(error: reqwest::Error, timeout: Duration) -> AdapterError {
    if error.is_timeout() {
        AdapterError::Timeout(timeout)
    } else if error.is_connect() {
        AdapterError::Connect(error.to_string())
    } else if error.is_builder() {
        AdapterError::InvalidUrl(error.to_string())
    } else {
        AdapterError::Request(error.to_string())
    }
}

#[async_trait]
impl Adapter for ReqwestAdapter {
    async fn execute(&self, request: AdapterRequest) -> Result<Response, AdapterError> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers)
            .timeout(timeout);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| classify(e, timeout))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| classify(e, timeout))?;

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}
