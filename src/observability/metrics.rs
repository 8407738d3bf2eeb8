//! Metrics collection and exposition.
//!
//! # Metrics
//! - `docgate_requests_total` (counter): requests by method, status
//! - `docgate_request_duration_seconds` (histogram): pipeline latency
//! - `docgate_cache_events_total` (counter): db props cache hit/miss/invalidate
//! - `docgate_upserts_total` (counter): backend writes by resulting status

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "docgate_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("docgate_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_cache_event(event: &'static str) {
    metrics::counter!("docgate_cache_events_total", "event" => event).increment(1);
}

pub fn record_upsert(status: u16) {
    metrics::counter!("docgate_upserts_total", "status" => status.to_string()).increment(1);
}
