mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::sample_pdf;
use http_body_util::BodyExt;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;
use tower::ServiceExt;
use watermark_service::config::{ScratchConfig, UploadConfig, WatermarkConfig};
use watermark_service::services::processor::DEFAULT_DESCRIPTOR;
use watermark_service::services::LopdfProcessor;
use watermark_service::startup::{build_router, AppState};

const BOUNDARY: &str = "router-test-boundary";

struct TestRouter {
    inner: axum::Router,
    scratch_root: std::path::PathBuf,
}

impl TestRouter {
    fn new(max_bytes: usize) -> Self {
        let scratch_root = std::path::PathBuf::from(format!(
            "target/test-scratch-{}",
            uuid::Uuid::new_v4()
        ))
        .join("tmp");
        let config = WatermarkConfig {
            common: CoreConfig::default(),
            scratch: ScratchConfig {
                dir: scratch_root.to_string_lossy().to_string(),
            },
            upload: UploadConfig { max_bytes },
        };
        let state = AppState::new(config, Arc::new(LopdfProcessor::new())).unwrap();

        Self {
            inner: build_router(state),
            scratch_root,
        }
    }
}

impl Drop for TestRouter {
    fn drop(&mut self) {
        if let Some(parent) = self.scratch_root.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }
}

fn multipart_body(file_name: &str, content: &[u8], text: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"pdf\"; filename=\"{f}\"\r\n\
             Content-Type: application/pdf\r\n\r\n",
            b = BOUNDARY,
            f = file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(
        format!(
            "\r\n--{b}\r\nContent-Disposition: form-data; name=\"text\"\r\n\r\n{t}\r\n--{b}--\r\n",
            b = BOUNDARY,
            t = text
        )
        .as_bytes(),
    );
    body
}

fn watermark_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/watermark")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

#[test]
fn state_style_comes_from_default_descriptor() {
    let config = WatermarkConfig {
        common: CoreConfig::default(),
        scratch: ScratchConfig::default(),
        upload: UploadConfig::default(),
    };

    let state = AppState::new(config, Arc::new(LopdfProcessor::new())).unwrap();

    assert_eq!(state.style.to_string(), DEFAULT_DESCRIPTOR);
    assert_eq!(state.style.points, 12.0);
    assert_eq!(state.style.opacity, 0.5);
}

#[tokio::test]
async fn upload_over_the_limit_is_invalid_form_data() {
    let router = TestRouter::new(1024);
    let padded = [sample_pdf(1), vec![b' '; 8 * 1024]].concat();

    let response = router
        .inner
        .clone()
        .oneshot(watermark_request(multipart_body("big.pdf", &padded, "X")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "Invalid form data");
}

#[tokio::test]
async fn upload_within_the_limit_is_processed() {
    let router = TestRouter::new(64 * 1024);

    let response = router
        .inner
        .clone()
        .oneshot(watermark_request(multipart_body(
            "small.pdf",
            &sample_pdf(1),
            "WITHIN",
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(body.starts_with(b"%PDF"));

    let leftover: Vec<_> = std::fs::read_dir(&router.scratch_root)
        .map(|entries| entries.filter_map(|e| e.ok()).collect())
        .unwrap_or_default();
    assert!(leftover.is_empty());
}

#[tokio::test]
async fn unknown_path_is_not_found_without_cors() {
    let router = TestRouter::new(1024);

    let response = router
        .inner
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/unknown")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
