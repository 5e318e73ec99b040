//! Prometheus recorder shared by the services, and the `/metrics` handler that renders it.

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Latency buckets in seconds. Reach further out than the exporter defaults so that slow
/// document processing still lands in a finite bucket.
pub const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Installs the global recorder, with [`DURATION_BUCKETS`] for each named histogram.
///
/// Call once at startup, before anything records a metric.
pub fn init_metrics(histograms: &[&str]) -> anyhow::Result<()> {
    if METRICS_HANDLE.get().is_some() {
        anyhow::bail!("metrics recorder already initialized");
    }

    let mut builder = PrometheusBuilder::new();
    for name in histograms {
        builder =
            builder.set_buckets_for_metric(Matcher::Full(name.to_string()), DURATION_BUCKETS)?;
    }

    let handle = builder
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {}", e))?;

    METRICS_HANDLE
        .set(handle)
        .map_err(|_| anyhow::anyhow!("metrics recorder already initialized"))
}

/// Current metrics in the Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        get_metrics(),
    )
}
