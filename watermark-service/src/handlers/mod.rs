pub mod health;
pub mod watermark;

pub use health::health_check;
pub use watermark::{method_not_allowed, preflight, watermark_pdf};
