//! Error types for the OCR pipeline.
//!
//! This module defines the main OCRError enum and the ProcessingStage enum
//! used to identify which part of the pipeline an error came from.

use thiserror::Error;

/// Result alias used throughout the pipeline.
pub type OcrResult<T> = Result<T, OCRError>;

/// Enum representing different stages of processing in the OCR pipeline.
///
/// Used to identify which stage of the pipeline an error occurred in,
/// providing context for debugging and error handling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProcessingStage {
    /// Error occurred during tensor operations.
    TensorOperation,
    /// Error occurred during image normalization.
    Normalization,
    /// Error occurred during image resizing.
    Resize,
    /// Error occurred during image processing operations.
    ImageProcessing,
    /// Error occurred during batch processing.
    BatchProcessing,
    /// Error occurred during post-processing.
    PostProcessing,
    /// Error occurred during pipeline execution.
    PipelineExecution,
    /// Generic processing error.
    Generic,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::TensorOperation => write!(f, "tensor operation"),
            ProcessingStage::Normalization => write!(f, "normalization"),
            ProcessingStage::Resize => write!(f, "resize"),
            ProcessingStage::ImageProcessing => write!(f, "image processing"),
            ProcessingStage::BatchProcessing => write!(f, "batch processing"),
            ProcessingStage::PostProcessing => write!(f, "post-processing"),
            ProcessingStage::PipelineExecution => write!(f, "pipeline execution"),
            ProcessingStage::Generic => write!(f, "processing"),
        }
    }
}

/// Enum representing the errors that can occur in the OCR pipeline.
///
/// Covers image loading and processing errors, inference errors, PDF
/// rasterization errors, and configuration errors.
#[derive(Error, Debug)]
pub enum OCRError {
    /// Error occurred while loading an image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// Error occurred during processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error occurred during inference.
    #[error("inference failed in model '{model_name}': {context}")]
    Inference {
        /// The name of the model where inference failed.
        model_name: String,
        /// Additional context about the inference error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from basic tensor operations (fallback for ndarray errors).
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// Error from PDF rasterization.
    #[error(transparent)]
    Pdf(#[from] crate::pdf::PdfError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),

    /// Error loading a model file, with context and suggestions.
    #[error("model load failed for '{model_path}': {reason}{suggestion}")]
    ModelLoad {
        /// Path to the model that failed to load
        model_path: String,
        /// Short reason string
        reason: String,
        /// Optional suggestion (prefixed with '; ' when present)
        suggestion: String,
        /// Underlying source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl From<image::ImageError> for OCRError {
    /// Converts an image::ImageError to OCRError::ImageLoad.
    fn from(error: image::ImageError) -> Self {
        Self::ImageLoad(error)
    }
}

/// Lightweight message-only error used as the source for errors that have
/// no underlying cause.
#[derive(Debug)]
struct MessageError(String);

impl std::fmt::Display for MessageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for MessageError {}

impl OCRError {
    /// Creates a processing error for a specific pipeline stage.
    ///
    /// # Arguments
    ///
    /// * `kind` - The stage of processing where the error occurred
    /// * `context` - A description of what was being processed
    /// * `source` - The underlying error
    pub fn processing_error(
        kind: ProcessingStage,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Creates an image processing error from a message.
    pub fn image_processing_error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Processing {
            kind: ProcessingStage::ImageProcessing,
            context: message.clone(),
            source: Box::new(MessageError(message)),
        }
    }

    /// Creates a post-processing error with context.
    pub fn post_processing_error(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind: ProcessingStage::PostProcessing,
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Creates a tensor operation error with context.
    pub fn tensor_operation(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind: ProcessingStage::TensorOperation,
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Creates an inference error for a named model.
    pub fn inference_error(
        model_name: impl Into<String>,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.into(),
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Creates an invalid input error from a message.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a configuration error with enhanced context and details.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use viet_ocr::core::errors::OCRError;
    /// let err = OCRError::config_error_detailed(
    ///     "recognition dictionary",
    ///     "dictionary file is empty"
    /// );
    /// assert!(matches!(err, OCRError::ConfigError { .. }));
    /// ```
    pub fn config_error_detailed(context: impl Into<String>, details: impl Into<String>) -> Self {
        Self::ConfigError {
            message: format!("{}: {}", context.into(), details.into()),
        }
    }

    /// Creates a configuration error with a suggestion for recovery.
    pub fn config_error_with_suggestion(
        context: impl Into<String>,
        details: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::ConfigError {
            message: format!(
                "{}: {}; suggestion: {}",
                context.into(),
                details.into(),
                suggestion.into()
            ),
        }
    }

    /// Creates a model load error for a model file that does not exist.
    pub fn model_not_found(model_path: impl Into<String>) -> Self {
        Self::ModelLoad {
            model_path: model_path.into(),
            reason: "file not found".to_string(),
            suggestion: "; ensure the model has been downloaded and the path is correct"
                .to_string(),
            source: None,
        }
    }

    /// Creates a model load error with a reason and underlying cause.
    pub fn model_load_failed(
        model_path: impl Into<String>,
        reason: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ModelLoad {
            model_path: model_path.into(),
            reason: reason.into(),
            suggestion: String::new(),
            source: Some(Box::new(source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processing_stage_display_is_lowercase() {
        assert_eq!(ProcessingStage::PostProcessing.to_string(), "post-processing");
        assert_eq!(ProcessingStage::Normalization.to_string(), "normalization");
        assert_eq!(ProcessingStage::Generic.to_string(), "processing");
    }

    #[test]
    fn image_processing_error_keeps_message() {
        let err = OCRError::image_processing_error("Empty bounding box");
        assert!(err.to_string().contains("image processing"));
        assert!(err.to_string().contains("Empty bounding box"));
    }

    #[test]
    fn model_not_found_mentions_path_and_suggestion() {
        let err = OCRError::model_not_found("models/det.onnx");
        let text = err.to_string();
        assert!(text.contains("models/det.onnx"));
        assert!(text.contains("file not found"));
        assert!(text.contains("suggestion") || text.contains("ensure"));
    }

    #[test]
    fn config_error_detailed_joins_context_and_details() {
        let err = OCRError::config_error_detailed("normalization", "std must be non-zero");
        assert_eq!(
            err.to_string(),
            "configuration: normalization: std must be non-zero"
        );
    }
}
