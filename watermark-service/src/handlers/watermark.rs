use crate::dtos::{UploadedPdf, WatermarkRequest};
use crate::services::{ScratchSpace, TextWatermark};
use crate::startup::AppState;
use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use service_core::error::AppError;
use std::time::Instant;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

const INVALID_FORM: &str = "Invalid form data";
const PDF_REQUIRED: &str = "PDF file is required";
const NOT_A_PDF: &str = "File must be a PDF";
const TEXT_REQUIRED: &str = "Text parameter is required";
const INTERNAL: &str = "Internal server error";
const PERSIST_FAILED: &str = "Error processing file";
const WATERMARK_FAILED: &str = "Error adding watermark to PDF";
const READ_FAILED: &str = "Error reading processed file";

/// `POST /api/watermark`
///
/// Validates the upload, stamps the text onto every page and streams the result back as an
/// attachment. The request's scratch directory is released when the response body finishes.
pub async fn watermark_pdf(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let result = watermark(&state, multipart).await;

    let outcome = match &result {
        Ok(_) => "ok",
        Err(AppError::BadRequest(_)) => "rejected",
        Err(_) => "failed",
    };
    metrics::counter!("watermark_requests_total", "outcome" => outcome).increment(1);

    result
}

async fn watermark(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::warn!(error = %e, "Rejected multipart request");
        AppError::bad_request(INVALID_FORM)
    })?;

    let request = WatermarkRequest::from_multipart(&mut multipart)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Error parsing multipart form");
            AppError::bad_request(INVALID_FORM)
        })?;

    let pdf = request
        .pdf
        .as_ref()
        .ok_or_else(|| AppError::bad_request(PDF_REQUIRED))?;

    if !pdf.has_pdf_extension() {
        return Err(AppError::bad_request(NOT_A_PDF));
    }

    let text = request
        .text()
        .ok_or_else(|| AppError::bad_request(TEXT_REQUIRED))?;

    if request.has_unwired_fields() {
        tracing::debug!(
            image_path = ?request.image_path,
            on_top = ?request.on_top,
            opacity = ?request.opacity,
            font_size = ?request.font_size,
            position = ?request.position,
            rotation = ?request.rotation,
            "Ignoring watermark options that are not supported yet"
        );
    }

    tracing::info!(
        file_name = %pdf.file_name,
        size = pdf.content.len(),
        "Watermark request accepted"
    );

    let scratch = allocate_scratch(state).await?;
    persist_upload(&scratch, pdf).await?;

    let started = Instant::now();
    state
        .processor
        .add_text_watermarks(
            &scratch.input_path(),
            &scratch.output_path(),
            &TextWatermark::new(text).with_style(state.style.clone()),
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, dir = ?scratch.dir(), "Error adding watermark");
            AppError::internal(WATERMARK_FAILED, e)
        })?;
    metrics::histogram!("watermark_processing_seconds").record(started.elapsed().as_secs_f64());

    let output = File::open(scratch.output_path()).await.map_err(|e| {
        tracing::error!(error = %e, dir = ?scratch.dir(), "Error opening output file");
        AppError::internal(READ_FAILED, e)
    })?;

    let disposition = content_disposition(&pdf.file_name);

    // The stream owns the scratch guard, so the directory outlives the last chunk sent.
    let stream = ReaderStream::new(output).map(move |chunk| {
        let _held = &scratch;
        chunk.map_err(|e| {
            tracing::error!(error = %e, "Error sending file");
            e
        })
    });

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

async fn allocate_scratch(state: &AppState) -> Result<ScratchSpace, AppError> {
    state.scratch.ensure().await.map_err(|e| {
        tracing::error!(error = %e, root = ?state.scratch.path(), "Error creating scratch root");
        AppError::internal(INTERNAL, e)
    })?;

    state.scratch.allocate().await.map_err(|e| {
        tracing::error!(error = %e, root = ?state.scratch.path(), "Error creating scratch space");
        AppError::internal(INTERNAL, e)
    })
}

async fn persist_upload(scratch: &ScratchSpace, pdf: &UploadedPdf) -> Result<(), AppError> {
    let path = scratch.input_path();

    let mut file = File::create(&path).await.map_err(|e| {
        tracing::error!(error = %e, path = ?path, "Error creating input file");
        AppError::internal(INTERNAL, e)
    })?;

    let copied = async {
        file.write_all(&pdf.content).await?;
        file.flush().await
    };
    copied.await.map_err(|e| {
        tracing::error!(error = %e, path = ?path, "Error copying file");
        AppError::internal(PERSIST_FAILED, e)
    })
}

/// `attachment; filename="watermarked_<name>"`, with characters that cannot appear inside a
/// quoted header value replaced by `_`.
fn content_disposition(file_name: &str) -> HeaderValue {
    let safe: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    HeaderValue::from_str(&format!("attachment; filename=\"watermarked_{}\"", safe))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"watermarked.pdf\""))
}

/// CORS preflight. The headers themselves come from the router layers.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
