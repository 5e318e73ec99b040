pub mod processor;
pub mod scratch;

pub use processor::{DocumentProcessor, LopdfProcessor, ProcessorError, TextWatermark};
pub use scratch::{ScratchRoot, ScratchSpace};
