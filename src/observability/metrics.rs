//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): requests by outcome and status
//! - `dispatch_duration_seconds` (histogram): dispatch latency
//! - `rmi_calls_total` (counter): remote method invocations by method name
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder the
//!   calls are no-ops
//! - The Prometheus exporter is opt-in (`observability.metrics_enabled`)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_dispatch(outcome: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "dispatch_requests_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("dispatch_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rmi_call(method: &str) {
    metrics::counter!("rmi_calls_total", "method" => method.to_string()).increment(1);
}
