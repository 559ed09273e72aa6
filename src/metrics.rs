//! Prometheus metrics for application observability.
//!
//! Metrics are exposed via a dedicated HTTP listener (default: `0.0.0.0:9090`).
//!
//! # Available Metrics
//!
//! ## Counters
//! - `repository_forwarded_overrides_total` - Origin fields taken from forwarding
//!   headers (labels: header, field)
//! - `repository_forwarded_parse_failures_total` - Malformed forwarding headers
//!   that were ignored (labels: header)
//! - `repository_error_responses_total` - Error responses (labels: kind, status)
//!
//! Without an installed recorder (tests, `METRICS_PORT=0`) recording is a no-op.

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const FORWARDED_OVERRIDES_TOTAL: &str = "repository_forwarded_overrides_total";
    pub const FORWARDED_PARSE_FAILURES_TOTAL: &str = "repository_forwarded_parse_failures_total";
    pub const ERROR_RESPONSES_TOTAL: &str = "repository_error_responses_total";
}

/// Initialize the Prometheus metrics exporter.
///
/// # Errors
///
/// Returns a message if the exporter cannot be installed (e.g. port in use,
/// or a recorder is already set).
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::FORWARDED_OVERRIDES_TOTAL,
        "Origin fields taken from forwarding headers"
    );
    describe_counter!(
        names::FORWARDED_PARSE_FAILURES_TOTAL,
        "Malformed forwarding headers that were ignored"
    );
    describe_counter!(
        names::ERROR_RESPONSES_TOTAL,
        "Error responses returned to clients"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

pub fn record_forwarded_override(header: &'static str, field: &'static str) {
    counter!(names::FORWARDED_OVERRIDES_TOTAL, "header" => header, "field" => field).increment(1);
}

pub fn record_forwarded_parse_failure(header: &'static str) {
    counter!(names::FORWARDED_PARSE_FAILURES_TOTAL, "header" => header).increment(1);
}

pub fn record_error_response(kind: &'static str, status: u16) {
    counter!(names::ERROR_RESPONSES_TOTAL, "kind" => kind, "status" => status.to_string())
        .increment(1);
}
