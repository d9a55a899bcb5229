//! Metrics collection and exposition.
//!
//! # Metrics
//! - `fastpaze_requests_total` (counter): requests by method and status
//! - `fastpaze_request_duration_seconds` (histogram): latency distribution
//! - `fastpaze_rate_limited_total` (counter): requests rejected by the rate limiter
//! - `fastpaze_active_connections` (gauge): current connection count
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed recorder
//!   every call is a no-op
//! - The Prometheus exporter runs its own listener, separate from the API port

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("fastpaze_requests_total", &labels).increment(1);
    metrics::histogram!("fastpaze_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    metrics::counter!("fastpaze_rate_limited_total").increment(1);
}

pub fn set_active_connections(count: usize) {
    metrics::gauge!("fastpaze_active_connections").set(count as f64);
}
