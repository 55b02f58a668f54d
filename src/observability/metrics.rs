//! Metrics collection and exposition.
//!
//! # Metrics
//! - `formforge_submissions_total` (counter): intake outcomes by `outcome`
//! - `formforge_rate_limited_total` (counter): denied submissions
//! - `formforge_notifications_total` (counter): notification results by `result`
//! - `formforge_request_duration_seconds` (histogram): latency by method, status
//! - `formforge_rate_limit_keys` (gauge): live rate-limit keys after a sweep
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed (tests, disabled exporter)
//! - Prometheus exporter runs on its own listener

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_submission(outcome: &'static str) {
    counter!("formforge_submissions_total", "outcome" => outcome).increment(1);
}

pub fn record_rate_limited() {
    counter!("formforge_rate_limited_total").increment(1);
}

pub fn record_notification(result: &'static str) {
    counter!("formforge_notifications_total", "result" => result).increment(1);
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    histogram!(
        "formforge_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limit_keys(keys: usize) {
    gauge!("formforge_rate_limit_keys").set(keys as f64);
}
