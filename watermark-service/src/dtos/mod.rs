pub mod watermark;

pub use watermark::{UploadedPdf, WatermarkRequest};
