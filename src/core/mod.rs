//! The core module of the OCR pipeline.
//!
//! This module contains the fundamental components shared by the rest of the
//! crate: configuration management, error handling, and the ONNX Runtime
//! integration. It also re-exports the commonly used types for convenience.

pub mod config;
pub mod errors;
pub mod inference;

/// 4D tensor in NCHW layout (batch, channels, height, width).
pub type Tensor4D = ndarray::Array4<f32>;

pub use config::{OrtExecutionProvider, OrtGraphOptimizationLevel, OrtSessionConfig};
pub use errors::{OCRError, OcrResult, ProcessingStage};
pub use inference::OrtInfer;
