//! Transport core: request execution against the cluster.
//!
//! # Responsibilities
//! - Pick a connection per attempt and hand the exchange to the adapter
//! - Classify each outcome and update pool health
//! - Retry on alternate nodes within the attempt budget
//! - Trigger topology reloads (every N requests, after failures, periodically)
//!
//! # Data Flow
//! ```text
//! perform_request
//!     → SELECT: selector.select(pool.selection_candidates())
//!         → none: PoolExhausted
//!     → EXECUTE: adapter.execute (bounded by timeout, deadline, cancellation)
//!     → classify:
//!         - 2xx/3xx → success (resurrect candidate goes alive)
//!         - network error / retry status → mark dead, maybe sniff, retry
//!         - 4xx → ClientError, node counts as reachable
//!         - 5xx → ServerError, node marked dead only by policy
//!     → budget spent: Exhausted { attempts, last }
//! ```
//!
//! # Design Decisions
//! - The pool lock is never held across the network call
//! - A deadline bounds the whole call, retry delays included
//! - Cancellation stops the in-flight attempt and every later one
//! - Sniff failures are logged and never fail a user request

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{ACCEPT_ENCODING, AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use rand::seq::SliceRandom;
use serde_json::Value;
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::adapter::{Adapter, AdapterError, AdapterRequest, Response, DEFAULT_REQUEST_TIMEOUT};
use crate::compression;
use crate::config::validation::{validate_config, ValidationError};
use crate::config::{ConfigError, TransportConfig};
use crate::error::TransportError;
use crate::observability::metrics;
use crate::observability::tracing::EndpointNames;
use crate::pool::{Connection, ConnectionPool, HealthState, ReconcilePolicy, ReconcileReport};
use crate::resilience::retries::{RetryPolicy, StatusClass};
use crate::selector::Selector;
use crate::serializer::Serializer;
use crate::sniffer::{SniffError, Sniffer};

/// Header describing the client to the cluster.
pub const META_HEADER: &str = "x-elastic-client-meta";

/// Request body: raw bytes or a JSON value encoded by the serializer.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Raw(Bytes),
    Json(Value),
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Body::Json(value)
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Raw(bytes)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Raw(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Body::Raw(Bytes::from_static(text.as_bytes()))
    }
}

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Endpoint name for the request span.
    pub endpoint: Option<String>,
    /// Retry count replacing the transport's `retry_on_failure`.
    pub retry_on_failure: Option<u32>,
    /// Statuses retried in addition to the transport's set.
    pub retry_on_status: Vec<u16>,
    /// Per-attempt timeout replacing the transport's.
    pub timeout: Option<Duration>,
    /// Budget for the whole call, measured from its start.
    pub deadline: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn endpoint(mut self, name: impl Into<String>) -> Self {
        self.endpoint = Some(name.into());
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retry_on_failure = Some(retries);
        self
    }

    pub fn retry_on_status(mut self, statuses: &[u16]) -> Self {
        self.retry_on_status.extend_from_slice(statuses);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn deadline(mut self, budget: Duration) -> Self {
        self.deadline = Some(budget);
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// A request to perform against the cluster.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Path relative to the node's path prefix; may carry a query string.
    pub path: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Body>,
    pub headers: HeaderMap,
    pub options: RequestOptions,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
            options: RequestOptions::default(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

/// Method, headers and encoded body shared by every attempt of a call.
#[derive(Debug)]
struct Prepared {
    method: Method,
    headers: HeaderMap,
    body: Option<Bytes>,
}

/// Builds a [`Transport`], optionally with injected components.
#[derive(Debug)]
pub struct TransportBuilder {
    config: TransportConfig,
    selector: Option<Arc<dyn Selector>>,
    adapter: Option<Arc<dyn Adapter>>,
    serializer: Option<Arc<dyn Serializer>>,
    endpoints: Option<EndpointNames>,
}

impl TransportBuilder {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            selector: None,
            adapter: None,
            serializer: None,
            endpoints: None,
        }
    }

    pub fn selector(mut self, selector: Arc<dyn Selector>) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn adapter(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = Some(serializer);
        self
    }

    /// Replace the default endpoint templates.
    pub fn endpoints(mut self, endpoints: EndpointNames) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    pub fn build(self) -> Result<Transport, TransportError> {
        let config = self.config;
        validate_config(&config).map_err(ConfigError::Validation)?;

        let mut hosts = config.resolved_hosts().map_err(ConfigError::from)?;
        if config.randomize_hosts {
            hosts.shuffle(&mut rand::thread_rng());
        }
        let pool = ConnectionPool::from_hosts(&hosts, config.resurrect_backoff())
            .map_err(ConfigError::from)?;

        let adapter_name = match self.adapter {
            Some(_) => "custom",
            None => config.adapter.name(),
        };
        let adapter = match self.adapter {
            Some(adapter) => adapter,
            None => config
                .adapter
                .build(config.request_timeout())
                .map_err(ConfigError::from)?,
        };

        let send_get_body_as = Method::from_bytes(config.send_get_body_as.as_bytes())
            .map_err(|_| invalid(ValidationError::InvalidMethod(config.send_get_body_as.clone())))?;

        let mut default_headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let parsed = HeaderName::from_bytes(name.as_bytes())
                .ok()
                .zip(HeaderValue::from_str(value).ok());
            let Some((name, value)) = parsed else {
                return Err(invalid(ValidationError::InvalidHeader(name.clone())));
            };
            default_headers.insert(name, value);
        }
        if config.enable_meta_header && !default_headers.contains_key(META_HEADER) {
            if let Some(value) = meta_header(adapter_name) {
                default_headers.insert(HeaderName::from_static(META_HEADER), value);
            }
        }

        tracing::info!(
            hosts = pool.len(),
            selector = ?config.selector,
            retries = config.retry_on_failure.retries(),
            "Transport initialized"
        );

        Ok(Transport {
            pool: Arc::new(pool),
            selector: self.selector.unwrap_or_else(|| config.selector.build()),
            adapter,
            serializer: self.serializer.unwrap_or_else(|| config.serializer.build()),
            sniffer: Sniffer::new(config.sniffer_timeout()),
            policy: RetryPolicy::from_config(&config),
            sniff_policy: config.sniff_policy,
            randomize_hosts: config.randomize_hosts,
            eager_resurrection: config.eager_resurrection,
            reload_after: config.reload_connections.interval(),
            sniff_interval: config.sniff_interval(),
            request_timeout: config.request_timeout(),
            send_get_body_as,
            default_headers,
            compression: config.compression,
            requests: AtomicU64::new(0),
            sniff_lock: AsyncMutex::new(()),
            endpoints: self.endpoints.unwrap_or_else(EndpointNames::with_defaults),
        })
    }
}

fn invalid(error: ValidationError) -> TransportError {
    ConfigError::Validation(vec![error]).into()
}

/// `et` is this client's version, `t` the transport's, `a` the HTTP backend.
fn meta_header(adapter: &str) -> Option<HeaderValue> {
    let version = env!("CARGO_PKG_VERSION");
    HeaderValue::from_str(&format!("et={version},t={version},a={adapter}")).ok()
}

/// Client-side transport over a pool of cluster nodes.
#[derive(Debug)]
pub struct Transport {
    pool: Arc<ConnectionPool>,
    selector: Arc<dyn Selector>,
    adapter: Arc<dyn Adapter>,
    serializer: Arc<dyn Serializer>,
    sniffer: Sniffer,
    policy: RetryPolicy,
    sniff_policy: ReconcilePolicy,
    randomize_hosts: bool,
    eager_resurrection: bool,
    reload_after: Option<u64>,
    sniff_interval: Option<Duration>,
    request_timeout: Option<Duration>,
    send_get_body_as: Method,
    default_headers: HeaderMap,
    compression: bool,
    requests: AtomicU64,
    /// Held while a sniff runs; concurrent triggers are skipped.
    sniff_lock: AsyncMutex<()>,
    endpoints: EndpointNames,
}

impl Transport {
    /// Build a transport with the components named in `config`.
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        TransportBuilder::new(config).build()
    }

    pub fn builder(config: TransportConfig) -> TransportBuilder {
        TransportBuilder::new(config)
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn endpoints(&self) -> &EndpointNames {
        &self.endpoints
    }

    /// Requests started since the transport was built.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Perform a request, retrying on alternate nodes per the retry policy.
    pub async fn perform_request(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        body: Option<Body>,
        headers: HeaderMap,
        options: RequestOptions,
    ) -> Result<Response, TransportError> {
        self.perform(Request {
            method,
            path: path.to_string(),
            params: params.to_vec(),
            body,
            headers,
            options,
        })
        .await
    }

    /// Same as [`Transport::perform_request`], taking a built [`Request`].
    pub async fn perform(&self, request: Request) -> Result<Response, TransportError> {
        let request_id = Uuid::new_v4();
        let endpoint =
            self.endpoints
                .resolve(request.options.endpoint.as_deref(), &request.method, &request.path);
        let span = tracing::info_span!(
            "request",
            endpoint = %endpoint,
            http.request.method = %request.method,
            url.path = %request.path,
            request_id = %request_id,
        );
        let method = request.method.to_string();
        let start = std::time::Instant::now();

        let result = async {
            self.maybe_reload_on_count().await;
            self.execute(request).await
        }
        .instrument(span)
        .await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        metrics::record_request(&method, &endpoint, outcome, start);
        result
    }

    /// Decode a response body with the transport's serializer.
    pub fn deserialize(&self, response: &Response) -> Result<Value, TransportError> {
        Ok(self.serializer.load(&response.body)?)
    }

    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        let policy = self
            .policy
            .with_overrides(request.options.retry_on_failure, &request.options.retry_on_status);
        let max_attempts = policy.max_attempts();
        let prepared = self.prepare(&request)?;
        let deadline = request.options.deadline.map(|budget| Instant::now() + budget);
        let cancel = request.options.cancel.clone().unwrap_or_default();

        let mut attempts: u32 = 0;
        let mut last: Option<TransportError> = None;

        while attempts < max_attempts {
            if cancel.is_cancelled() {
                return Err(TransportError::Cancelled { attempts });
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(TransportError::DeadlineExceeded {
                    attempts,
                    last: last.map(Box::new),
                });
            }

            // SELECT
            let candidates = self.pool.selection_candidates(self.eager_resurrection);
            let Some(connection) = self.selector.select(&candidates) else {
                tracing::error!(attempts, "No alive or resurrectable connection");
                return Err(TransportError::PoolExhausted {
                    attempts,
                    last: last.map(Box::new),
                });
            };
            attempts += 1;
            let was_candidate = connection.state() == HealthState::ResurrectCandidate;
            let host = connection.to_string();

            // EXECUTE
            let adapter_request =
                self.adapter_request(&connection, &request, &prepared, deadline);
            tracing::debug!(host = %host, attempt = attempts, probe = was_candidate, "Sending request");

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(host = %host, attempt = attempts, "Request cancelled");
                    return Err(TransportError::Cancelled { attempts });
                }
                _ = sleep_until(deadline) => {
                    tracing::warn!(host = %host, attempt = attempts, "Deadline reached during attempt");
                    return Err(TransportError::DeadlineExceeded {
                        attempts,
                        last: last.map(Box::new),
                    });
                }
                result = self.adapter.execute(adapter_request) => result,
            };
            let outcome = match outcome {
                Ok(response) => Ok(compression::inflate(response)?),
                Err(error) => Err(error),
            };

            // CLASSIFY
            let failure = match outcome {
                Ok(response) => match policy.classify(response.status) {
                    StatusClass::Success => {
                        metrics::record_attempt(&host, "success");
                        if was_candidate {
                            self.pool.mark_alive(&connection);
                        }
                        return Ok(response);
                    }
                    StatusClass::ClientError => {
                        metrics::record_attempt(&host, "client_error");
                        // The node answered, so it is healthy.
                        if was_candidate {
                            self.pool.mark_alive(&connection);
                        }
                        return Err(TransportError::ClientError {
                            status: response.status,
                            response,
                        });
                    }
                    StatusClass::ServerError => {
                        metrics::record_attempt(&host, "server_error");
                        if policy.mark_dead_on_server_error {
                            self.pool.mark_dead(&connection);
                        }
                        return Err(TransportError::ServerError {
                            status: response.status,
                            response,
                        });
                    }
                    StatusClass::Retryable => {
                        metrics::record_attempt(&host, "retryable");
                        tracing::warn!(
                            host = %host,
                            attempt = attempts,
                            status = %response.status,
                            "Retryable status"
                        );
                        status_error(response)
                    }
                },
                Err(AdapterError::InvalidUrl(message)) => {
                    return Err(TransportError::InvalidRequest(message));
                }
                Err(error) => {
                    metrics::record_attempt(&host, "transport_error");
                    tracing::warn!(host = %host, attempt = attempts, error = %error, "Attempt failed");
                    connection_error(&host, error)
                }
            };

            // RETRYABLE_FAILURE
            self.pool.mark_dead(&connection);
            if policy.reload_on_failure {
                let _ = self.reload_connections().await;
            }
            last = Some(failure);

            if attempts < max_attempts
                && self.pool.selection_candidates(self.eager_resurrection).is_empty()
            {
                tracing::error!(attempts, "Every connection is dead, giving up early");
                return Err(TransportError::PoolExhausted {
                    attempts,
                    last: last.map(Box::new),
                });
            }

            if attempts < max_attempts && !policy.delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(TransportError::Cancelled { attempts }),
                    _ = sleep_until(deadline) => {
                        return Err(TransportError::DeadlineExceeded {
                            attempts,
                            last: last.map(Box::new),
                        });
                    }
                    _ = time::sleep(policy.delay) => {}
                }
            }
        }

        match last {
            Some(last) => {
                tracing::error!(attempts, error = %last, "Retry budget exhausted");
                Err(TransportError::Exhausted {
                    attempts,
                    last: Box::new(last),
                })
            }
            None => Err(TransportError::PoolExhausted {
                attempts,
                last: None,
            }),
        }
    }

    fn prepare(&self, request: &Request) -> Result<Prepared, TransportError> {
        let mut headers = self.default_headers.clone();
        for name in request.headers.keys() {
            headers.remove(name);
        }
        headers.extend(request.headers.clone());

        let body = match &request.body {
            None => None,
            Some(Body::Raw(bytes)) => Some(bytes.clone()),
            Some(Body::Json(value)) => {
                let encoded = self.serializer.dump(value)?;
                if !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(
                        CONTENT_TYPE,
                        HeaderValue::from_static(self.serializer.content_type()),
                    );
                }
                Some(encoded)
            }
        };

        // A caller-set content-encoding means the body is already encoded.
        let body = match body {
            Some(bytes) if self.compression && !headers.contains_key(CONTENT_ENCODING) => {
                headers.insert(CONTENT_ENCODING, HeaderValue::from_static(compression::GZIP));
                Some(compression::gzip(&bytes)?)
            }
            body => body,
        };
        if self.compression && !headers.contains_key(ACCEPT_ENCODING) {
            headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(compression::GZIP));
        }

        let method = if request.method == Method::GET && body.is_some() {
            self.send_get_body_as.clone()
        } else {
            request.method.clone()
        };

        Ok(Prepared {
            method,
            headers,
            body,
        })
    }

    fn adapter_request(
        &self,
        connection: &Connection,
        request: &Request,
        prepared: &Prepared,
        deadline: Option<Instant>,
    ) -> AdapterRequest {
        let mut headers = prepared.headers.clone();
        if !headers.contains_key(AUTHORIZATION) {
            if let Some(auth) = connection.authorization() {
                headers.insert(AUTHORIZATION, auth);
            }
        }

        let timeout = request.options.timeout.or(self.request_timeout);
        let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
        let timeout = match (timeout, remaining) {
            (Some(timeout), Some(remaining)) => Some(timeout.min(remaining)),
            (None, Some(remaining)) => Some(DEFAULT_REQUEST_TIMEOUT.min(remaining)),
            (timeout, None) => timeout,
        };

        AdapterRequest {
            method: prepared.method.clone(),
            url: connection.url(&request.path, &request.params),
            headers,
            body: prepared.body.clone(),
            timeout,
        }
    }

    async fn maybe_reload_on_count(&self) {
        let count = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(every) = self.reload_after {
            if every > 0 && count % every == 0 {
                tracing::debug!(requests = count, "Request count reached, reloading connections");
                let _ = self.reload_connections().await;
            }
        }
    }

    /// Sniff the cluster and reconcile the reported nodes into the pool.
    ///
    /// Fails with [`SniffError::InProgress`] when another sniff is running.
    /// On any failure the pool is left untouched.
    pub async fn reload_connections(&self) -> Result<ReconcileReport, TransportError> {
        let Ok(_guard) = self.sniff_lock.try_lock() else {
            tracing::debug!("Sniff already in progress, skipping");
            metrics::record_sniff("skipped");
            return Err(SniffError::InProgress.into());
        };

        let mut seeds = self.pool.alive();
        seeds.extend(self.pool.dead());

        let mut nodes = match self.sniffer.sniff(&seeds, self.adapter.as_ref()).await {
            Ok(result) => result.nodes,
            Err(e) => {
                tracing::warn!(error = %e, "Sniffing failed, keeping current pool");
                metrics::record_sniff("failure");
                return Err(e.into());
            }
        };
        if self.randomize_hosts {
            nodes.shuffle(&mut rand::thread_rng());
        }

        let report = match self.pool.reconcile(&nodes, self.sniff_policy) {
            Ok(report) => report,
            Err(e) => {
                metrics::record_sniff("failure");
                return Err(e.into());
            }
        };
        if report.is_unchanged() {
            tracing::debug!(retained = report.retained, "Sniffed topology unchanged");
        } else {
            tracing::info!(
                added = report.added.len(),
                removed = report.removed.len(),
                retained = report.retained,
                "Reconciled sniffed topology"
            );
        }
        metrics::record_sniff("success");
        Ok(report)
    }

    /// Start the periodic sniffer if `sniff_interval_secs` is configured.
    ///
    /// The task stops when `shutdown` fires.
    pub fn spawn_sniffer(
        self: &Arc<Self>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Option<JoinHandle<()>> {
        let interval = self.sniff_interval?;
        let transport = Arc::clone(self);

        Some(tokio::spawn(async move {
            tracing::info!(interval = ?interval, "Periodic sniffer starting");
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let _ = transport.reload_connections().await;
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("Periodic sniffer received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        }))
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn status_error(response: Response) -> TransportError {
    let status = response.status;
    if status.is_server_error() {
        TransportError::ServerError { status, response }
    } else {
        TransportError::ClientError { status, response }
    }
}

fn connection_error(host: &str, error: AdapterError) -> TransportError {
    match error {
        AdapterError::Timeout(after) => TransportError::Timeout {
            host: host.to_string(),
            after,
        },
        AdapterError::Connect(message)
        | AdapterError::Request(message)
        | AdapterError::InvalidUrl(message) => TransportError::ConnectionFailed {
            host: host.to_string(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use http::StatusCode;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Records every request and answers with `reply`, else a plain 200.
    #[derive(Debug, Default)]
    struct Recorder {
        seen: Mutex<Vec<AdapterRequest>>,
        reply: Mutex<Option<Response>>,
    }

    #[async_trait]
    impl Adapter for Recorder {
        async fn execute(&self, request: AdapterRequest) -> Result<Response, AdapterError> {
            self.seen.lock().push(request);
            let reply = self.reply.lock().clone();
            Ok(reply.unwrap_or_else(|| Response::new(StatusCode::OK, r#"{"acknowledged":true}"#)))
        }
    }

    fn transport(config: TransportConfig) -> (Transport, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let transport = Transport::builder(config)
            .adapter(recorder.clone())
            .build()
            .unwrap();
        (transport, recorder)
    }

    #[tokio::test]
    async fn test_get_with_body_uses_configured_method() {
        let mut config = TransportConfig::with_hosts(["node-1:9200"]);
        config.send_get_body_as = "POST".into();
        let (transport, recorder) = transport(config);

        transport
            .perform(Request::get("/logs/_search").body(json!({"size": 0})))
            .await
            .unwrap();
        transport.perform(Request::get("/logs/_count")).await.unwrap();

        let seen = recorder.seen.lock();
        assert_eq!(seen[0].method, Method::POST);
        assert_eq!(seen[0].headers[CONTENT_TYPE], "application/json");
        assert_eq!(seen[0].body.as_deref(), Some(&br#"{"size":0}"#[..]));
        assert_eq!(seen[1].method, Method::GET);
        assert!(seen[1].body.is_none());
    }

    #[tokio::test]
    async fn test_headers_merge_and_credentials() {
        let mut config = TransportConfig::with_hosts(["http://elastic:pw@node-1:9200"]);
        config.headers.insert("x-opaque-id".into(), "default".into());
        config.headers.insert("x-team".into(), "search".into());
        let (transport, recorder) = transport(config);

        let request = Request::get("/_cluster/health")
            .param("level", "indices")
            .header(
                HeaderName::from_static("x-opaque-id"),
                HeaderValue::from_static("call"),
            );
        transport.perform(request).await.unwrap();

        let seen = recorder.seen.lock();
        assert_eq!(seen[0].headers["x-opaque-id"], "call");
        assert_eq!(seen[0].headers["x-team"], "search");
        assert!(seen[0].headers[AUTHORIZATION].to_str().unwrap().starts_with("Basic "));
        assert_eq!(
            seen[0].url.as_str(),
            "http://node-1:9200/_cluster/health?level=indices"
        );
    }

    #[tokio::test]
    async fn test_compression_gzips_body_and_inflates_response() {
        use flate2::read::GzDecoder;
        use std::io::Read;

        let mut config = TransportConfig::with_hosts(["node-1:9200"]);
        config.compression = true;
        let (transport, recorder) = transport(config);

        let mut reply = Response::new(
            StatusCode::OK,
            compression::gzip(br#"{"hits":{"total":3}}"#).unwrap(),
        );
        reply
            .headers
            .insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        *recorder.reply.lock() = Some(reply);

        let request = Request::new(Method::POST, "/logs/_search").body(json!({"size": 1}));
        let response = transport.perform(request).await.unwrap();
        assert_eq!(transport.deserialize(&response).unwrap()["hits"]["total"], 3);
        assert!(response.headers.get(CONTENT_ENCODING).is_none());

        let seen = recorder.seen.lock();
        assert_eq!(seen[0].headers[CONTENT_ENCODING], "gzip");
        assert_eq!(seen[0].headers[ACCEPT_ENCODING], "gzip");
        assert_eq!(seen[0].headers[CONTENT_TYPE], "application/json");
        let mut sent = String::new();
        GzDecoder::new(seen[0].body.as_deref().unwrap())
            .read_to_string(&mut sent)
            .unwrap();
        assert_eq!(sent, r#"{"size":1}"#);
    }

    #[tokio::test]
    async fn test_compression_off_by_default() {
        let (transport, recorder) = transport(TransportConfig::with_hosts(["node-1:9200"]));
        transport
            .perform(Request::new(Method::PUT, "/logs").body("{}"))
            .await
            .unwrap();

        let seen = recorder.seen.lock();
        assert!(seen[0].headers.get(CONTENT_ENCODING).is_none());
        assert!(seen[0].headers.get(ACCEPT_ENCODING).is_none());
        assert_eq!(seen[0].body.as_deref(), Some(&b"{}"[..]));
    }

    #[tokio::test]
    async fn test_corrupt_compressed_response_fails_without_retry() {
        let mut config = TransportConfig::with_hosts(["node-1:9200", "node-2:9200"]);
        config.retry_on_failure = crate::config::schema::RetryOnFailure::Count(2);
        let (transport, recorder) = transport(config);

        let mut reply = Response::new(StatusCode::OK, "not gzip");
        reply
            .headers
            .insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        *recorder.reply.lock() = Some(reply);

        let err = transport.perform(Request::get("/")).await.unwrap_err();
        assert!(matches!(err, TransportError::Compression(_)));
        assert_eq!(recorder.seen.lock().len(), 1);
        assert_eq!(transport.pool().alive().len(), 2);
    }

    #[tokio::test]
    async fn test_meta_header_sent_by_default() {
        let (client, recorder) = transport(TransportConfig::with_hosts(["node-1:9200"]));
        client.perform(Request::get("/")).await.unwrap();

        let mut config = TransportConfig::with_hosts(["node-1:9200"]);
        config.enable_meta_header = false;
        let (quiet, quiet_recorder) = transport(config);
        quiet.perform(Request::get("/")).await.unwrap();

        let seen = recorder.seen.lock();
        let meta = seen[0].headers[META_HEADER].to_str().unwrap();
        assert!(meta.starts_with(&format!("et={}", env!("CARGO_PKG_VERSION"))));
        assert!(meta.ends_with(",a=custom"));
        assert!(quiet_recorder.seen.lock()[0].headers.get(META_HEADER).is_none());
    }

    #[test]
    fn test_meta_header_names_configured_adapter() {
        let transport = Transport::new(TransportConfig::with_hosts(["node-1:9200"])).unwrap();
        let meta = transport.default_headers[META_HEADER].to_str().unwrap();
        assert!(meta.ends_with(",a=reqwest"));
    }

    #[tokio::test]
    async fn test_timeout_clamped_to_deadline() {
        let mut config = TransportConfig::with_hosts(["node-1:9200"]);
        config.request_timeout_ms = Some(5_000);
        let (transport, recorder) = transport(config);

        transport.perform(Request::get("/")).await.unwrap();
        let options = RequestOptions::default().deadline(Duration::from_millis(200));
        transport.perform(Request::get("/").options(options)).await.unwrap();

        let seen = recorder.seen.lock();
        assert_eq!(seen[0].timeout, Some(Duration::from_secs(5)));
        assert!(seen[1].timeout.unwrap() <= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_deserialize_and_counter() {
        let (transport, _) = transport(TransportConfig::with_hosts(["node-1:9200"]));
        let response = transport.perform(Request::get("/")).await.unwrap();
        assert_eq!(transport.deserialize(&response).unwrap()["acknowledged"], true);
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = TransportConfig::with_hosts(["node-1:9200"]);
        config.retry_on_status = vec![1000];
        let err = Transport::new(config).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Configuration(ConfigError::Validation(_))
        ));
    }
}
