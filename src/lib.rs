//! Vietnamese OCR pipeline with an HTTP API.
//!
//! This crate implements a complete OCR pipeline for Vietnamese documents:
//! contrast enhancement (grayscale + CLAHE), DB text detection, and CTC text
//! recognition over ONNX Runtime sessions, plus PDF rasterization via
//! PDFium. The [`pipeline::OcrPipeline`] type ties the stages together; both
//! models are loaded once at build time and the pipeline is shared read-only
//! afterwards.
//!
//! # Pipeline
//!
//! ```text
//! rasterize pages (PDF only) → preprocess (grayscale + CLAHE) →
//! detect text-line boxes → crop per box → recognize each crop →
//! postprocess text → assemble lines into pages, pages into a document
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use viet_ocr::pipeline::OcrPipelineBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = OcrPipelineBuilder::new(
//!     "models/text_detection.onnx",
//!     "models/text_recognition.onnx",
//!     "models/vietnamese_chars.txt",
//! )
//! .build()?;
//!
//! let text = pipeline.process_file(Path::new("document.pdf"))?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod models;
pub mod pdf;
pub mod pipeline;
pub mod processors;
pub mod utils;

pub use crate::core::{OCRError, OcrResult};
pub use crate::pdf::{PdfError, PdfRasterizer, PdfRenderSettings};
pub use crate::pipeline::{OcrPageResult, OcrPipeline, OcrPipelineBuilder, TextRegion};
