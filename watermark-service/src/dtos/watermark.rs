use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError};
use std::str::FromStr;

pub const PDF_FIELD: &str = "pdf";
pub const TEXT_FIELD: &str = "text";

/// The uploaded `pdf` file part.
#[derive(Debug, Clone)]
pub struct UploadedPdf {
    pub file_name: String,
    pub content: Bytes,
}

impl UploadedPdf {
    pub fn has_pdf_extension(&self) -> bool {
        self.file_name.to_lowercase().ends_with(".pdf")
    }
}

/// Fields of a watermark upload.
///
/// Only `pdf` and `text` drive processing. The remaining fields are accepted for forward
/// compatibility; values that fail to parse are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct WatermarkRequest {
    pub pdf: Option<UploadedPdf>,
    pub text: Option<String>,
    pub image_path: Option<String>,
    pub on_top: Option<bool>,
    pub opacity: Option<f64>,
    pub font_size: Option<i32>,
    pub position: Option<String>,
    pub rotation: Option<f64>,
}

impl WatermarkRequest {
    /// Drains the multipart body.
    ///
    /// A part counts as the upload only when it is named `pdf` and carries a non-empty
    /// filename; every other field is read from parts without one. The first occurrence of a
    /// name wins.
    pub async fn from_multipart(multipart: &mut Multipart) -> Result<Self, MultipartError> {
        let mut request = WatermarkRequest::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if let Some(file_name) = field.file_name().and_then(base_name) {
                let content = field.bytes().await?;
                if name == PDF_FIELD && request.pdf.is_none() {
                    request.pdf = Some(UploadedPdf { file_name, content });
                }
                continue;
            }

            let value = field.text().await?;
            match name.as_str() {
                TEXT_FIELD => set_once(&mut request.text, Some(value)),
                "imagePath" => set_once(&mut request.image_path, non_empty(value)),
                "onTop" => set_once(&mut request.on_top, lenient(&value)),
                "opacity" => set_once(&mut request.opacity, lenient(&value)),
                "fontSize" => set_once(&mut request.font_size, lenient(&value)),
                "position" => set_once(&mut request.position, non_empty(value)),
                "rotation" => set_once(&mut request.rotation, lenient(&value)),
                other => tracing::debug!(field = %other, "Ignoring unknown form field"),
            }
        }

        Ok(request)
    }

    /// The watermark text, if one was supplied and is not empty.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    pub fn has_unwired_fields(&self) -> bool {
        self.image_path.is_some()
            || self.on_top.is_some()
            || self.opacity.is_some()
            || self.font_size.is_some()
            || self.position.is_some()
            || self.rotation.is_some()
    }
}

/// Last path element of a client-supplied filename. Browsers leave the file input's
/// filename empty when nothing was picked, and that counts as no file at all.
fn base_name(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    let trimmed = raw.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        return Some(raw[..1].to_string());
    }
    let start = trimmed.rfind(['/', '\\']).map_or(0, |i| i + 1);
    Some(trimmed[start..].to_string())
}

fn set_once<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn lenient<T: FromStr>(value: &str) -> Option<T> {
    value.trim().parse().ok()
}
