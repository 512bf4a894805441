//! OCR processing logic shared between CLI and server modes.

use crate::config::OcrConfig;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
#[cfg(feature = "cuda")]
use viet_ocr::core::config::OrtExecutionProvider;
use viet_ocr::core::config::OrtSessionConfig;
use viet_ocr::pipeline::{
    OcrPageResult, OcrPipeline, OcrPipelineBuilder, assemble_document_text, assemble_page_text,
};

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Failed to load image: {0}")]
    ImageLoad(String),

    #[error("OCR processing failed: {0}")]
    Processing(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Successful OCR response for an uploaded or local file
#[derive(Debug, Serialize)]
pub struct OcrSuccessResponse {
    pub success: bool,
    pub filename: String,
    pub file_type: String,
    pub text: String,
    /// Character count of `text` (not its byte length).
    pub text_length: usize,
}

impl OcrSuccessResponse {
    pub fn new(filename: String, file_type: String, text: String) -> Self {
        let text_length = text.chars().count();
        Self {
            success: true,
            filename,
            file_type,
            text,
            text_length,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct OcrErrorResponse {
    pub success: bool,
    pub error: String,
}

impl OcrErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
        }
    }
}

/// A single text region in the structured CLI output
#[derive(Debug, Serialize)]
pub struct TextRegionResponse {
    pub text: String,
    pub confidence: f32,
    pub bounding_box: BoundingBoxResponse,
}

/// Bounding box coordinates
#[derive(Debug, Serialize)]
pub struct BoundingBoxResponse {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

/// Structured results for a single page
#[derive(Debug, Serialize)]
pub struct PageOcrResponse {
    /// 1-based page number
    pub page: usize,
    pub text: String,
    pub regions: Vec<TextRegionResponse>,
}

/// Structured OCR report for a file, used by the CLI's JSON output
#[derive(Debug, Serialize)]
pub struct FileOcrResponse {
    pub success: bool,
    pub filename: String,
    pub file_type: String,
    pub text: String,
    pub text_length: usize,
    pub pages: Vec<PageOcrResponse>,
}

/// OCR engine wrapper for thread-safe access
pub struct OcrEngine {
    pipeline: OcrPipeline,
}

impl OcrEngine {
    /// Create a new OCR engine with the given configuration
    pub fn new(config: &OcrConfig) -> Result<Self, OcrError> {
        // Validate model files exist
        if !config.det_model.exists() {
            return Err(OcrError::ModelNotFound(format!(
                "Detection model not found: {}",
                config.det_model.display()
            )));
        }
        if !config.rec_model.exists() {
            return Err(OcrError::ModelNotFound(format!(
                "Recognition model not found: {}",
                config.rec_model.display()
            )));
        }
        if !config.dict_path.exists() {
            return Err(OcrError::ModelNotFound(format!(
                "Dictionary file not found: {}",
                config.dict_path.display()
            )));
        }

        let ort_config = parse_device_config(&config.device, config.intra_threads)?;

        let mut builder =
            OcrPipelineBuilder::new(&config.det_model, &config.rec_model, &config.dict_path);

        if let Some(ort_config) = ort_config {
            builder = builder.ort_session(ort_config);
        }

        let pipeline = builder
            .build()
            .map_err(|e| OcrError::Config(e.to_string()))?;

        Ok(Self { pipeline })
    }

    /// Extract text from an image file
    pub fn process_image_file(&self, path: &Path) -> Result<String, OcrError> {
        self.pipeline
            .ocr_image_file(path)
            .map_err(map_pipeline_error)
    }

    /// Extract text from a PDF file, with per-page headers
    pub fn process_pdf_file(&self, path: &Path) -> Result<String, OcrError> {
        self.pipeline.ocr_pdf_file(path).map_err(map_pipeline_error)
    }

    /// Extract text from a file, dispatching on its extension
    pub fn process_file(&self, path: &Path) -> Result<String, OcrError> {
        self.pipeline.process_file(path).map_err(map_pipeline_error)
    }

    /// Run OCR on a file and return structured per-page results
    pub fn predict_file(&self, path: &Path) -> Result<Vec<OcrPageResult>, OcrError> {
        match file_extension(path).as_str() {
            "pdf" => self
                .pipeline
                .predict_pdf(path)
                .map_err(map_pipeline_error),
            "png" | "jpg" | "jpeg" => {
                let image = viet_ocr::utils::load_image(path)
                    .map_err(|e| OcrError::ImageLoad(e.to_string()))?;
                let page = self.pipeline.predict(&image).map_err(map_pipeline_error)?;
                Ok(vec![page])
            }
            other => Err(OcrError::InvalidInput(format!(
                "unsupported file type: '{other}' (expected .pdf, .png, .jpg, or .jpeg)"
            ))),
        }
    }

    /// Run OCR on a file and build the structured CLI report
    pub fn process_file_report(&self, path: &Path) -> Result<FileOcrResponse, OcrError> {
        let extension = file_extension(path);
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| path.display().to_string());

        let pages = self.predict_file(path)?;

        let text = if extension == "pdf" {
            let page_texts: Vec<String> = pages
                .iter()
                .map(|page| assemble_page_text(&page.text_regions))
                .collect();
            assemble_document_text(&page_texts)
        } else {
            pages
                .first()
                .map(|page| assemble_page_text(&page.text_regions))
                .unwrap_or_default()
        };

        Ok(FileOcrResponse {
            success: true,
            filename,
            file_type: extension,
            text_length: text.chars().count(),
            text,
            pages: Self::pages_to_response(&pages),
        })
    }

    /// Convert structured page results to the CLI response shape
    pub fn pages_to_response(pages: &[OcrPageResult]) -> Vec<PageOcrResponse> {
        pages
            .iter()
            .map(|page| {
                let regions: Vec<TextRegionResponse> = page
                    .text_regions
                    .iter()
                    .map(|region| {
                        let bbox = &region.bounding_box;
                        TextRegionResponse {
                            text: region
                                .text
                                .as_ref()
                                .map(|t| t.to_string())
                                .unwrap_or_default(),
                            confidence: region.confidence.unwrap_or(0.0),
                            bounding_box: BoundingBoxResponse {
                                x_min: bbox.x_min(),
                                y_min: bbox.y_min(),
                                x_max: bbox.x_max(),
                                y_max: bbox.y_max(),
                            },
                        }
                    })
                    .collect();

                PageOcrResponse {
                    page: page.index + 1,
                    text: assemble_page_text(&page.text_regions),
                    regions,
                }
            })
            .collect()
    }
}

/// Lowercased extension of a path, without the leading dot
pub fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default()
}

fn map_pipeline_error(error: viet_ocr::OCRError) -> OcrError {
    match error {
        viet_ocr::OCRError::InvalidInput { message } => OcrError::InvalidInput(message),
        other => OcrError::Processing(other.to_string()),
    }
}

/// Parse device string and create OrtSessionConfig
fn parse_device_config(
    device: &str,
    intra_threads: Option<usize>,
) -> Result<Option<OrtSessionConfig>, OcrError> {
    let device_lower = device.to_lowercase();

    if device_lower == "cpu" {
        return Ok(intra_threads.map(|threads| OrtSessionConfig::new().with_intra_threads(threads)));
    }

    #[cfg(feature = "cuda")]
    {
        if device_lower.starts_with("cuda") {
            let device_id = if device_lower == "cuda" {
                0
            } else if let Some(id_str) = device_lower.strip_prefix("cuda:") {
                id_str
                    .parse::<i32>()
                    .map_err(|_| OcrError::Config(format!("Invalid CUDA device ID: {device}")))?
            } else {
                return Err(OcrError::Config(format!(
                    "Invalid device format: {device}. Expected 'cuda' or 'cuda:N'"
                )));
            };

            let mut config = OrtSessionConfig::new().with_execution_providers(vec![
                OrtExecutionProvider::CUDA {
                    device_id: Some(device_id),
                },
                OrtExecutionProvider::CPU,
            ]);
            if let Some(threads) = intra_threads {
                config = config.with_intra_threads(threads);
            }
            return Ok(Some(config));
        }
    }

    #[cfg(not(feature = "cuda"))]
    {
        if device_lower.starts_with("cuda") {
            return Err(OcrError::Config(format!(
                "CUDA device '{device}' requested but CUDA feature is not enabled"
            )));
        }
    }

    Err(OcrError::Config(format!("Unsupported device: {device}")))
}

/// Thread-safe OCR engine wrapped in Arc
pub type SharedOcrEngine = Arc<OcrEngine>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;
    use viet_ocr::pipeline::TextRegion;
    use viet_ocr::processors::BoundingBox;

    #[test]
    fn test_success_response_counts_characters_not_bytes() {
        let response = OcrSuccessResponse::new(
            "scan.png".to_string(),
            "image".to_string(),
            "Tiếng Việt".to_string(),
        );

        assert!(response.success);
        assert_eq!(response.text_length, 10);
        assert!(response.text.len() > response.text_length);
    }

    #[test]
    fn test_error_response_serialization() {
        let json = serde_json::to_value(OcrErrorResponse::new("boom")).expect("serialize");
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "boom");
    }

    #[test]
    fn test_file_extension_is_lowercased() {
        assert_eq!(file_extension(Path::new("scan.PNG")), "png");
        assert_eq!(file_extension(Path::new("a/b/doc.Pdf")), "pdf");
        assert_eq!(file_extension(Path::new("noext")), "");
    }

    #[test]
    fn test_parse_device_config_cpu() {
        let config = parse_device_config("cpu", None).expect("cpu is valid");
        assert!(config.is_none());

        let config = parse_device_config("CPU", Some(4))
            .expect("cpu is valid")
            .expect("threads set");
        assert_eq!(config.intra_threads, Some(4));
    }

    #[test]
    fn test_parse_device_config_rejects_unknown_devices() {
        assert!(matches!(
            parse_device_config("tpu", None),
            Err(OcrError::Config(_))
        ));
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn test_parse_device_config_rejects_cuda_without_feature() {
        assert!(matches!(
            parse_device_config("cuda", None),
            Err(OcrError::Config(_))
        ));
    }

    #[test]
    fn test_pages_to_response_numbers_pages_from_one() {
        let region = TextRegion::with_recognition(
            BoundingBox::from_coords(1.0, 2.0, 30.0, 12.0),
            Some(StdArc::from("dòng")),
            Some(0.88),
        );
        let pages = vec![
            OcrPageResult::new(0, vec![region]),
            OcrPageResult::new(1, Vec::new()),
        ];

        let response = OcrEngine::pages_to_response(&pages);
        assert_eq!(response.len(), 2);
        assert_eq!(response[0].page, 1);
        assert_eq!(response[1].page, 2);
        assert_eq!(response[0].text, "dòng");
        assert_eq!(response[0].regions.len(), 1);
        assert_eq!(response[0].regions[0].confidence, 0.88);
        assert_eq!(response[0].regions[0].bounding_box.x_max, 30.0);
        assert!(response[1].regions.is_empty());
    }
}
