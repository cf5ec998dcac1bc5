//! hyper-util adapter for plain http clusters.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::Uri;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time;

use crate::adapter::{Adapter, AdapterError, AdapterRequest, Response};

/// Adapter on top of the hyper-util legacy client. No TLS.
#[derive(Debug, Clone)]
pub struct HyperAdapter {
    client: Client<HttpConnector, Full<Bytes>>,
    default_timeout: Duration,
}

impl HyperAdapter {
    pub fn new(default_timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            default_timeout,
        }
    }
}

#[async_trait]
impl Adapter for HyperAdapter {
    async fn execute(&self, request: AdapterRequest) -> Result<Response, AdapterError> {
        if request.url.scheme() != "http" {
            return Err(AdapterError::InvalidUrl(format!(
                "{} (hyper adapter supports http only)",
                request.url
            )));
        }

        let uri: Uri = request
            .url
            .as_str()
            .parse()
            .map_err(|e: http::uri::InvalidUri| AdapterError::InvalidUrl(e.to_string()))?;

        let mut builder = http::Request::builder().method(request.method).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(request.headers);
        }
        let outgoing = builder
            .body(Full::new(request.body.unwrap_or_default()))
            .map_err(|e| AdapterError::InvalidUrl(e.to_string()))?;

        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let exchange = async {
            let response: http::Response<Incoming> = self.client.request(outgoing).await.map_err(|e| {
                if e.is_connect() {
                    AdapterError::Connect(e.to_string())
                } else {
                    AdapterError::Request(e.to_string())
                }
            })?;
            let (parts, body) = response.into_parts();
            let body = body
                .collect()
                .await
                .map_err(|e| AdapterError::Request(e.to_string()))?
                .to_bytes();
            Ok::<_, AdapterError>(Response {
                status: parts.status,
                headers: parts.headers,
                body,
            })
        };

        match time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(AdapterError::Timeout(timeout)),
        }
    }
}
