//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): requests by method, status, mode
//! - `dispatch_request_duration_seconds` (histogram): latency by mode
//! - `dispatch_upstream_errors_total` (counter): proxy failures by kind
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Prometheus exporter runs its own listener, off the request path

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

/// Record one finished dispatch.
pub fn record_request(method: &str, status: u16, mode: &'static str, start: Instant) {
    metrics::counter!(
        "dispatch_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "mode" => mode
    )
    .increment(1);
    metrics::histogram!("dispatch_request_duration_seconds", "mode" => mode)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_error(kind: &'static str) {
    metrics::counter!("dispatch_upstream_errors_total", "kind" => kind).increment(1);
}
