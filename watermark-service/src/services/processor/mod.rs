//! Document processing capability used by the watermark endpoint.

pub mod font_metrics;
pub mod pages;
pub mod pdf;
pub mod style;

pub use pages::{PageSelection, PageSelectionError};
pub use pdf::LopdfProcessor;
pub use style::{Position, Rgb, StandardFont, StyleError, WatermarkStyle, DEFAULT_DESCRIPTOR};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("failed to read PDF: {0}")]
    Load(#[source] lopdf::Error),

    #[error("encrypted documents are not supported")]
    Encrypted,

    #[error("page selection matches no page of a {0}-page document")]
    NoPagesSelected(usize),

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("failed to encode watermark content: {0}")]
    Encode(#[source] BoxError),

    #[error("failed to write PDF: {0}")]
    Save(#[source] BoxError),

    #[error("watermark task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Values written into the document information dictionary of the output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataOverride {
    pub producer: Option<String>,
    pub title: Option<String>,
}

/// Everything that describes one text watermark pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TextWatermark {
    pub pages: PageSelection,
    /// Stamp over the page content when true, otherwise draw underneath it.
    pub on_top: bool,
    pub text: String,
    pub style: WatermarkStyle,
    pub metadata: Option<MetadataOverride>,
}

impl TextWatermark {
    /// All pages, on top, default style, no metadata changes.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            pages: PageSelection::all(),
            on_top: true,
            text: text.into(),
            style: WatermarkStyle::default(),
            metadata: None,
        }
    }

    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_on_top(mut self, on_top: bool) -> Self {
        self.on_top = on_top;
        self
    }

    pub fn with_style(mut self, style: WatermarkStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_metadata(mut self, metadata: MetadataOverride) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[async_trait]
pub trait DocumentProcessor: Send + Sync {
    /// Reads the PDF at `input`, stamps `watermark` onto the selected pages and writes the
    /// result to `output`. On failure `output` may hold a partial file.
    async fn add_text_watermarks(
        &self,
        input: &Path,
        output: &Path,
        watermark: &TextWatermark,
    ) -> Result<(), ProcessorError>;
}
