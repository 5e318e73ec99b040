use crate::config::WatermarkConfig;
use crate::handlers;
use crate::services::processor::{WatermarkStyle, DEFAULT_DESCRIPTOR};
use crate::services::{DocumentProcessor, LopdfProcessor, ScratchRoot};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::observability::metrics_endpoint;
use service_core::middleware::{
    metrics::metrics_middleware,
    tracing::{make_request_span, request_id_middleware},
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "POST, GET, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type";

#[derive(Clone)]
pub struct AppState {
    pub config: WatermarkConfig,
    pub scratch: ScratchRoot,
    pub processor: Arc<dyn DocumentProcessor>,
    /// Style every watermark is drawn with, parsed from [`DEFAULT_DESCRIPTOR`].
    pub style: WatermarkStyle,
}

impl AppState {
    pub fn new(
        config: WatermarkConfig,
        processor: Arc<dyn DocumentProcessor>,
    ) -> Result<Self, AppError> {
        let style = DEFAULT_DESCRIPTOR.parse::<WatermarkStyle>().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("invalid watermark descriptor: {}", e))
        })?;
        let scratch = ScratchRoot::new(&config.scratch.dir);

        Ok(Self {
            config,
            scratch,
            processor,
            style,
        })
    }
}

/// Routes under `/api/watermark`. Every response, errors and 405s included, carries the
/// CORS headers.
fn watermark_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/api/watermark",
            post(handlers::watermark_pdf)
                .options(handlers::preflight)
                .fallback(handlers::method_not_allowed),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static(ALLOW_ORIGIN),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        ))
}

pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.upload.max_bytes;

    Router::new()
        .merge(watermark_routes(max_upload_bytes))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(metrics_endpoint))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<axum::body::Body>))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: WatermarkConfig) -> Result<Self, AppError> {
        Self::build_with_processor(config, Arc::new(LopdfProcessor::new())).await
    }

    /// Same as [`Application::build`] with a caller-supplied document processor.
    pub async fn build_with_processor(
        config: WatermarkConfig,
        processor: Arc<dyn DocumentProcessor>,
    ) -> Result<Self, AppError> {
        let state = AppState::new(config.clone(), processor)?;

        // Created up front so a bad SCRATCH_DIR shows at startup. Requests re-create it if
        // it disappears later.
        state.scratch.ensure().await.map_err(|e| {
            tracing::error!(
                "Failed to create scratch directory {}: {}",
                state.scratch.path().display(),
                e
            );
            AppError::from(e)
        })?;

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port,
            scratch_dir = %state.scratch.path().display(),
            max_upload_bytes = config.upload.max_bytes,
            "Listening"
        );

        let server = axum::serve(listener, build_router(state))
            .with_graceful_shutdown(service_core::shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}
