//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define router metrics (request count, latency)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `strata_requests_total` (counter): total requests by method, status, router
//! - `strata_request_duration_seconds` (histogram): latency by method, router
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade, a no-op until a recorder is installed
//! - Unmatched requests are labelled `router = "none"`

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus exporter on `addr`. Needs a running Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one completed request.
pub fn record_request(method: &str, status: u16, router: &str, start: Instant) {
    let elapsed = start.elapsed().as_secs_f64();

    metrics::counter!(
        "strata_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "router" => router.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "strata_request_duration_seconds",
        "method" => method.to_string(),
        "router" => router.to_string()
    )
    .record(elapsed);
}
