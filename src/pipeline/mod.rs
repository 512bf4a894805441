//! The OCR pipeline module.
//!
//! This module provides the high-level API for running OCR over images and
//! PDF documents: contrast enhancement, text detection, cropping, text
//! recognition, and text assembly.
//!
//! # Main APIs
//!
//! - [`OcrPipelineBuilder`] - Constructs a pipeline with both models loaded
//! - [`OcrPipeline`] - Runs OCR and assembles page/document text

pub mod assembly;
pub mod ocr;
pub mod result;

pub use assembly::{assemble_document_text, assemble_page_text, collapse_whitespace};
pub use ocr::{OcrPipeline, OcrPipelineBuilder};
pub use result::{OcrPageResult, TextRegion};
