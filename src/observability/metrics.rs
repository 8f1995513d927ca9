//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, and
//!   disposition
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `proxy_upstream_retries_total` (counter): upstream retries by reason
//!
//! # Design Decisions
//! - Recording is always on and cheap; the Prometheus exporter is opt-in
//!   (render hosts run several proxy instances, a fixed exporter port
//!   would collide)
//! - Without an installed exporter the macros are no-ops

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter and register metric descriptions.
/// Failure to bind the exporter is logged, not fatal; the proxy serves
/// without it.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics exporter listening"),
        Err(err) => tracing::error!(error = %err, "failed to install metrics exporter"),
    }

    describe_counter!(
        "proxy_requests_total",
        "Total requests by method, status, and disposition"
    );
    describe_histogram!(
        "proxy_request_duration_seconds",
        "Request handling latency in seconds"
    );
    describe_counter!(
        "proxy_upstream_retries_total",
        "Upstream retry attempts by reason"
    );
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, disposition: &str, start_time: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "disposition" => disposition.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds").record(start_time.elapsed().as_secs_f64());
}

/// Record one upstream retry.
pub fn record_retry(reason: &'static str) {
    counter!("proxy_upstream_retries_total", "reason" => reason).increment(1);
}
