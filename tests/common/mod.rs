//! Shared mock cluster utilities for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{routing::get, Json, Router};
use http::StatusCode;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use cluster_transport::adapter::{Adapter, AdapterError, AdapterRequest, Response};
use cluster_transport::sniffer::SNIFF_PATH;

/// Start a node that answers every request with the status and body returned by `f`.
pub async fn start_programmable_node<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let _ = socket.read(&mut buf).await;
                let (status, body) = f().await;
                let status_text = match status {
                    200 => "200 OK",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    502 => "502 Bad Gateway",
                    503 => "503 Service Unavailable",
                    _ => "200 OK",
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start a node with a fixed 200 body.
pub async fn start_node(body: &'static str) -> SocketAddr {
    start_programmable_node(move || async move { (200, body.to_string()) }).await
}

/// Start an axum node that reports `publish_addresses` on the discovery endpoint.
pub async fn start_sniff_node(publish_addresses: Vec<String>) -> SocketAddr {
    let payload = nodes_payload(&publish_addresses);
    let app = Router::new()
        .route(
            &format!("/{SNIFF_PATH}"),
            get(move || {
                let payload = payload.clone();
                async move { Json(payload) }
            }),
        )
        .fallback(|| async { Json(json!({"name": "seed"})) });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// `_nodes/http` payload listing the given publish addresses.
pub fn nodes_payload(publish_addresses: &[String]) -> Value {
    let nodes: serde_json::Map<String, Value> = publish_addresses
        .iter()
        .enumerate()
        .map(|(i, address)| {
            (
                format!("node-{i}"),
                json!({"name": format!("node-{i}"), "http": {"publish_address": address}}),
            )
        })
        .collect();
    json!({"cluster_name": "test", "nodes": nodes})
}

/// A loopback port nothing listens on.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Scripted answer of the in-memory adapter.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, &'static str),
    Fail(AdapterError),
    /// Sleep for the request timeout, then time out.
    Hang,
}

impl Reply {
    pub fn refused() -> Self {
        Reply::Fail(AdapterError::Connect("connection refused".into()))
    }
}

/// In-memory adapter answering from per-node scripts.
///
/// Nodes are keyed by `host:port`. Scripted replies are consumed first, then the
/// node's default, then `200 {}`. Discovery requests are answered separately.
#[derive(Debug, Default)]
pub struct ScriptedAdapter {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    defaults: Mutex<HashMap<String, Reply>>,
    sniff_reply: Mutex<Option<Reply>>,
    sniff_payload: Mutex<Option<String>>,
    sniff_latency: Mutex<Duration>,
    calls: Mutex<Vec<String>>,
    sniffs: Mutex<Vec<String>>,
    seen: Mutex<Vec<AdapterRequest>>,
}

impl ScriptedAdapter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a one-shot reply for `node`.
    pub fn then(&self, node: &str, reply: Reply) {
        self.scripts
            .lock()
            .entry(node.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Reply used for `node` once its script is consumed.
    pub fn always(&self, node: &str, reply: Reply) {
        self.defaults.lock().insert(node.to_string(), reply);
    }

    /// Nodes reported by discovery requests.
    pub fn cluster(&self, publish_addresses: &[&str]) {
        let addresses: Vec<String> = publish_addresses.iter().map(|a| a.to_string()).collect();
        *self.sniff_payload.lock() = Some(nodes_payload(&addresses).to_string());
    }

    /// Override the discovery answer (e.g. an error).
    pub fn sniff_reply(&self, reply: Reply) {
        *self.sniff_reply.lock() = Some(reply);
    }

    pub fn sniff_latency(&self, latency: Duration) {
        *self.sniff_latency.lock() = latency;
    }

    /// Nodes hit by regular requests, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Nodes hit by discovery requests, in order.
    pub fn sniffs(&self) -> Vec<String> {
        self.sniffs.lock().clone()
    }

    pub fn requests(&self) -> Vec<AdapterRequest> {
        self.seen.lock().clone()
    }

    fn next_reply(&self, node: &str) -> Reply {
        if let Some(reply) = self.scripts.lock().get_mut(node).and_then(VecDeque::pop_front) {
            return reply;
        }
        self.defaults
            .lock()
            .get(node)
            .cloned()
            .unwrap_or(Reply::Status(200, "{}"))
    }
}

async fn play(reply: Reply, request: &AdapterRequest) -> Result<Response, AdapterError> {
    match reply {
        Reply::Status(status, body) => Ok(Response::new(StatusCode::from_u16(status).unwrap(), body)),
        Reply::Fail(error) => Err(error),
        Reply::Hang => {
            let timeout = request.timeout.unwrap_or(Duration::from_secs(30));
            tokio::time::sleep(timeout).await;
            Err(AdapterError::Timeout(timeout))
        }
    }
}

#[async_trait]
impl Adapter for ScriptedAdapter {
    async fn execute(&self, request: AdapterRequest) -> Result<Response, AdapterError> {
        let node = format!(
            "{}:{}",
            request.url.host_str().unwrap_or_default(),
            request.url.port_or_known_default().unwrap_or_default()
        );

        if request.url.path() == format!("/{SNIFF_PATH}") {
            self.sniffs.lock().push(node);
            let latency = *self.sniff_latency.lock();
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            let scripted = self.sniff_reply.lock().clone();
            if let Some(reply) = scripted {
                return play(reply, &request).await;
            }
            let payload = self.sniff_payload.lock().clone().unwrap_or_else(|| "{}".into());
            return Ok(Response::new(StatusCode::OK, payload));
        }

        self.calls.lock().push(node.clone());
        self.seen.lock().push(request.clone());
        let reply = self.next_reply(&node);
        play(reply, &request).await
    }
}
