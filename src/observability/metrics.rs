//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): handled requests by route, outcome
//! - `gateway_request_duration_seconds` (histogram): handler latency by route
//! - `gateway_rejections_total` (counter): gate rejections by route, reason
//! - `gateway_store_errors_total` (counter): rate-limit store failures by store
//! - `gateway_outbound_fetch_total` (counter): website fetches by outcome

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &str, outcome: &str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// A request stopped by attestation or rate limiting.
pub fn record_rejection(route: &str, reason: &str) {
    counter!(
        "gateway_rejections_total",
        "route" => route.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

pub fn record_store_error(store: &str) {
    counter!("gateway_store_errors_total", "store" => store.to_string()).increment(1);
}

pub fn record_fetch(outcome: &str) {
    counter!("gateway_outbound_fetch_total", "outcome" => outcome.to_string()).increment(1);
}
