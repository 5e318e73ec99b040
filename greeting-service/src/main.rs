use greeting_service::config::GreetingConfig;
use greeting_service::startup::Application;
use service_core::observability::{init_metrics, init_tracing};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = GreetingConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing(
        "greeting-service",
        &config.common.log_level,
        config.common.otlp_endpoint.as_deref(),
    );

    init_metrics(&["http_request_duration_seconds"]).map_err(|e| {
        tracing::error!("Failed to initialize metrics: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    let app = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to start greeting-service: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    tracing::info!(
        "Greeting endpoint available at: GET http://localhost:{}/api/hello",
        app.port()
    );

    app.run_until_stopped().await
}
