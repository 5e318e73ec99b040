#![allow(dead_code)]

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use service_core::config::Config as CoreConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use watermark_service::config::{ScratchConfig, UploadConfig, WatermarkConfig};
use watermark_service::services::{
    DocumentProcessor, LopdfProcessor, ProcessorError, TextWatermark,
};
use watermark_service::startup::Application;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub scratch_root: PathBuf,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(Arc::new(LopdfProcessor::new()), UploadConfig::default()).await
    }

    pub async fn spawn_with_processor(processor: Arc<dyn DocumentProcessor>) -> Self {
        Self::spawn_with(processor, UploadConfig::default()).await
    }

    pub async fn spawn_with_upload_limit(max_bytes: usize) -> Self {
        Self::spawn_with(Arc::new(LopdfProcessor::new()), UploadConfig { max_bytes }).await
    }

    async fn spawn_with(processor: Arc<dyn DocumentProcessor>, upload: UploadConfig) -> Self {
        let scratch_root = test_scratch_root();
        let config = WatermarkConfig {
            common: CoreConfig {
                port: 0, // Random port for testing
                ..CoreConfig::default()
            },
            scratch: ScratchConfig {
                dir: scratch_root.to_string_lossy().to_string(),
            },
            upload,
        };

        let app = Application::build_with_processor(config, processor)
            .await
            .expect("Failed to build test application");
        let port = app.port();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        TestApp {
            address: format!("http://127.0.0.1:{}", port),
            port,
            scratch_root,
            client: reqwest::Client::new(),
        }
    }

    pub fn watermark_url(&self) -> String {
        format!("{}/api/watermark", self.address)
    }

    pub async fn post_watermark(&self, form: reqwest::multipart::Form) -> reqwest::Response {
        self.client
            .post(self.watermark_url())
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Names of the per-request directories currently under the scratch root.
    pub fn scratch_entries(&self) -> Vec<String> {
        match std::fs::read_dir(&self.scratch_root) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// The guard is released after the last body chunk is handed to the connection, which
    /// can trail the client seeing the end of the body by a moment.
    pub async fn wait_for_empty_scratch(&self) -> Vec<String> {
        for _ in 0..50 {
            let entries = self.scratch_entries();
            if entries.is_empty() {
                return entries;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.scratch_entries()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(parent) = self.scratch_root.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }
}

fn test_scratch_root() -> PathBuf {
    PathBuf::from(format!("target/test-scratch-{}", Uuid::new_v4())).join("tmp")
}

/// A minimal, valid PDF with `page_count` pages of text.
pub fn sample_pdf(page_count: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for number in 1..=page_count {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal(format!("Sample page {}", number))],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode page content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialize sample PDF");
    bytes
}

pub fn pdf_part(file_name: &str, content: Vec<u8>) -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(content)
        .file_name(file_name.to_string())
        .mime_str("application/pdf")
        .expect("valid mime type")
}

pub fn watermark_form(file_name: &str, content: Vec<u8>, text: &str) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new()
        .part("pdf", pdf_part(file_name, content))
        .text("text", text.to_string())
}

/// Always fails, without touching the output path.
pub struct FailingProcessor;

#[async_trait]
impl DocumentProcessor for FailingProcessor {
    async fn add_text_watermarks(
        &self,
        _input: &Path,
        _output: &Path,
        _watermark: &TextWatermark,
    ) -> Result<(), ProcessorError> {
        Err(ProcessorError::Malformed("simulated failure".to_string()))
    }
}

/// Reports success but never writes the output file.
pub struct SilentProcessor;

#[async_trait]
impl DocumentProcessor for SilentProcessor {
    async fn add_text_watermarks(
        &self,
        _input: &Path,
        _output: &Path,
        _watermark: &TextWatermark,
    ) -> Result<(), ProcessorError> {
        Ok(())
    }
}

/// Panics inside the blocking pool, like a library bug would.
pub struct PanickingProcessor;

#[async_trait]
impl DocumentProcessor for PanickingProcessor {
    async fn add_text_watermarks(
        &self,
        _input: &Path,
        _output: &Path,
        _watermark: &TextWatermark,
    ) -> Result<(), ProcessorError> {
        tokio::task::spawn_blocking(|| panic!("processor blew up")).await?;
        Ok(())
    }
}
