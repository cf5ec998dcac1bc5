//! Transport metrics.
//!
//! # Metrics
//! - `transport_requests_total` (counter): calls by method, endpoint, outcome
//! - `transport_request_duration_seconds` (histogram): whole-call latency
//! - `transport_attempts_total` (counter): individual attempts by outcome
//! - `transport_connections_dead_total` (counter): dead markings by host
//! - `transport_connections_alive` (gauge): connections in rotation
//! - `transport_sniff_total` (counter): sniff runs by outcome

use std::time::Instant;

pub fn record_request(method: &str, endpoint: &str, outcome: &'static str, start: Instant) {
    ::metrics::counter!(
        "transport_requests_total",
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    ::metrics::histogram!(
        "transport_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// `outcome` is one of `success`, `retryable`, `client_error`, `server_error`, `transport_error`.
pub fn record_attempt(host: &str, outcome: &'static str) {
    ::metrics::counter!(
        "transport_attempts_total",
        "host" => host.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_connection_dead(host: &str) {
    ::metrics::counter!("transport_connections_dead_total", "host" => host.to_string()).increment(1);
}

pub fn set_alive_connections(count: usize) {
    ::metrics::gauge!("transport_connections_alive").set(count as f64);
}

pub fn record_sniff(outcome: &'static str) {
    ::metrics::counter!("transport_sniff_total", "outcome" => outcome).increment(1);
}
