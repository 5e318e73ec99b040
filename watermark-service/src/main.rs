use service_core::observability::{init_metrics, init_tracing};
use watermark_service::config::WatermarkConfig;
use watermark_service::startup::Application;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = WatermarkConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing(
        "watermark-service",
        &config.common.log_level,
        config.common.otlp_endpoint.as_deref(),
    );

    init_metrics(&[
        "http_request_duration_seconds",
        "watermark_processing_seconds",
    ])
    .map_err(|e| {
        tracing::error!("Failed to initialize metrics: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    let app = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to start watermark-service: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    tracing::info!(
        "Watermark endpoint available at: POST http://localhost:{}/api/watermark",
        app.port()
    );

    app.run_until_stopped().await
}
