//! High-level OCR pipeline and builder API.
//!
//! This module provides `OcrPipelineBuilder` for constructing the full OCR
//! pipeline: contrast enhancement, text detection, per-region cropping, and
//! text recognition, plus PDF rasterization for multi-page documents. Both
//! ONNX sessions are loaded once at build time and the resulting pipeline is
//! immutable, so it can be shared across threads behind an `Arc`.

use crate::core::{OCRError, OcrResult, OrtSessionConfig};
use crate::models::{CtcRecognizer, CtcRecognizerBuilder, DbDetector, DbDetectorBuilder};
use crate::pdf::{PdfRasterizer, PdfRenderSettings};
use crate::pipeline::assembly::{assemble_document_text, assemble_page_text};
use crate::pipeline::result::{OcrPageResult, TextRegion};
use crate::processors::{Clahe, enhance_for_detection};
use crate::utils::{BBoxCrop, gray_to_rgb, load_image};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_CLAHE_CLIP_LIMIT: f32 = 2.0;
const CLAHE_GRID_COLS: u32 = 8;
const CLAHE_GRID_ROWS: u32 = 8;

/// Builder for constructing OCR pipelines.
///
/// # Example
///
/// ```no_run
/// use viet_ocr::pipeline::OcrPipelineBuilder;
///
/// let pipeline = OcrPipelineBuilder::new(
///     "models/text_detection.onnx",
///     "models/text_recognition.onnx",
///     "models/vietnamese_chars.txt",
/// )
/// .region_batch_size(16)
/// .build()
/// .expect("failed to build OCR pipeline");
/// ```
#[derive(Debug)]
pub struct OcrPipelineBuilder {
    detection_model: PathBuf,
    recognition_model: PathBuf,
    dictionary_path: PathBuf,
    ort_session_config: Option<OrtSessionConfig>,
    region_batch_size: Option<usize>,
    clahe_clip_limit: Option<f32>,
    pdf_settings: Option<PdfRenderSettings>,
}

impl OcrPipelineBuilder {
    /// Creates a new pipeline builder with the required model paths.
    ///
    /// # Arguments
    ///
    /// * `detection_model` - Path to the text detection ONNX model
    /// * `recognition_model` - Path to the text recognition ONNX model
    /// * `dictionary_path` - Path to the character dictionary file
    pub fn new(
        detection_model: impl Into<PathBuf>,
        recognition_model: impl Into<PathBuf>,
        dictionary_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            detection_model: detection_model.into(),
            recognition_model: recognition_model.into(),
            dictionary_path: dictionary_path.into(),
            ort_session_config: None,
            region_batch_size: None,
            clahe_clip_limit: None,
            pdf_settings: None,
        }
    }

    /// Sets the ONNX Runtime session configuration.
    ///
    /// This configuration is applied to both models in the pipeline.
    pub fn ort_session(mut self, config: OrtSessionConfig) -> Self {
        self.ort_session_config = Some(config);
        self
    }

    /// Sets the batch size for recognizing detected text regions.
    ///
    /// Controls memory usage during text recognition. Smaller values use
    /// less memory.
    pub fn region_batch_size(mut self, size: usize) -> Self {
        self.region_batch_size = Some(size);
        self
    }

    /// Sets the CLAHE clip limit used during contrast enhancement.
    pub fn clahe_clip_limit(mut self, clip_limit: f32) -> Self {
        self.clahe_clip_limit = Some(clip_limit);
        self
    }

    /// Sets the PDF rendering configuration.
    pub fn pdf_render_settings(mut self, settings: PdfRenderSettings) -> Self {
        self.pdf_settings = Some(settings);
        self
    }

    /// Builds the OCR pipeline.
    ///
    /// Loads both ONNX sessions, the character dictionary, and binds the
    /// PDFium library. Any failure here is terminal; nothing is retried.
    pub fn build(self) -> Result<OcrPipeline, OCRError> {
        let mut detector_builder = DbDetectorBuilder::new();
        if let Some(ref ort_config) = self.ort_session_config {
            detector_builder = detector_builder.session_config(ort_config.clone());
        }
        let detector = detector_builder.build(&self.detection_model)?;

        let mut recognizer_builder = CtcRecognizerBuilder::new();
        if let Some(ref ort_config) = self.ort_session_config {
            recognizer_builder = recognizer_builder.session_config(ort_config.clone());
        }
        if let Some(size) = self.region_batch_size {
            recognizer_builder = recognizer_builder.batch_size(size);
        }
        let recognizer = recognizer_builder.build(&self.recognition_model, &self.dictionary_path)?;

        let enhancer = Clahe::new(
            self.clahe_clip_limit.unwrap_or(DEFAULT_CLAHE_CLIP_LIMIT),
            CLAHE_GRID_COLS,
            CLAHE_GRID_ROWS,
        )?;

        let rasterizer = PdfRasterizer::new(self.pdf_settings.unwrap_or_default())?;

        Ok(OcrPipeline {
            detector,
            recognizer,
            enhancer,
            rasterizer,
        })
    }
}

/// OCR pipeline for extracting text from images and PDF documents.
///
/// Holds the detection and recognition sessions loaded at build time. All
/// prediction methods take `&self`, so a single pipeline instance serves
/// concurrent requests.
pub struct OcrPipeline {
    detector: DbDetector,
    recognizer: CtcRecognizer,
    enhancer: Clahe,
    rasterizer: PdfRasterizer,
}

impl OcrPipeline {
    /// Creates a new pipeline builder.
    pub fn builder(
        detection_model: impl Into<PathBuf>,
        recognition_model: impl Into<PathBuf>,
        dictionary_path: impl Into<PathBuf>,
    ) -> OcrPipelineBuilder {
        OcrPipelineBuilder::new(detection_model, recognition_model, dictionary_path)
    }

    /// Runs OCR on a single image.
    ///
    /// The image is contrast enhanced, text lines are detected, and each
    /// detected region is cropped and recognized. Regions come back in
    /// detection order; regions whose crop failed keep their bounding box
    /// but carry no text.
    pub fn predict(&self, image: &RgbImage) -> OcrResult<OcrPageResult> {
        self.predict_page(image, 0)
    }

    /// Runs OCR on every page of a PDF document.
    pub fn predict_pdf(&self, path: &Path) -> OcrResult<Vec<OcrPageResult>> {
        let page_images = self.rasterizer.render_pdf_file(path)?;
        tracing::debug!(pages = page_images.len(), "rasterized PDF document");

        let mut results = Vec::with_capacity(page_images.len());
        for (index, page_image) in page_images.iter().enumerate() {
            results.push(self.predict_page(page_image, index)?);
        }

        Ok(results)
    }

    /// Extracts text from an image file.
    ///
    /// Recognized lines are joined with newlines in detection order.
    pub fn ocr_image_file(&self, path: &Path) -> OcrResult<String> {
        let image = load_image(path)?;
        let page = self.predict(&image)?;
        Ok(assemble_page_text(&page.text_regions))
    }

    /// Extracts text from a PDF file.
    ///
    /// Non-empty pages are labeled with `--- Page N ---` headers and joined
    /// with blank lines.
    pub fn ocr_pdf_file(&self, path: &Path) -> OcrResult<String> {
        let pages = self.predict_pdf(path)?;
        let page_texts: Vec<String> = pages
            .iter()
            .map(|page| assemble_page_text(&page.text_regions))
            .collect();
        Ok(assemble_document_text(&page_texts))
    }

    /// Extracts text from a file, dispatching on its extension.
    ///
    /// Supports `.pdf`, `.png`, `.jpg`, and `.jpeg` (case-insensitive).
    pub fn process_file(&self, path: &Path) -> OcrResult<String> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => self.ocr_pdf_file(path),
            "png" | "jpg" | "jpeg" => self.ocr_image_file(path),
            _ => Err(OCRError::invalid_input(format!(
                "unsupported file type: '{}' (expected .pdf, .png, .jpg, or .jpeg)",
                extension
            ))),
        }
    }

    fn predict_page(&self, image: &RgbImage, index: usize) -> OcrResult<OcrPageResult> {
        let enhanced = enhance_for_detection(image, &self.enhancer);
        let detection_input = gray_to_rgb(&enhanced);

        let boxes = self.detector.predict(&detection_input)?;
        tracing::debug!(page = index, regions = boxes.len(), "text detection complete");

        // Crops come from the enhanced image, matching the detector's view.
        let crops = BBoxCrop::batch_crop_bounding_boxes(&detection_input, &boxes);
        let mut kept_indices = Vec::with_capacity(crops.len());
        let mut kept_crops = Vec::with_capacity(crops.len());
        for (region_index, crop) in crops.into_iter().enumerate() {
            match crop {
                Ok(crop) => {
                    kept_indices.push(region_index);
                    kept_crops.push(crop);
                }
                Err(err) => {
                    tracing::warn!(
                        page = index,
                        region = region_index,
                        error = %err,
                        "skipping text region that could not be cropped"
                    );
                }
            }
        }

        let recognized = self.recognizer.predict_batch(&kept_crops)?;
        tracing::debug!(
            page = index,
            recognized = recognized.len(),
            "text recognition complete"
        );

        let mut regions: Vec<TextRegion> = boxes.into_iter().map(TextRegion::new).collect();
        for (slot, result) in kept_indices.into_iter().zip(recognized) {
            regions[slot].text = Some(Arc::from(result.text));
            regions[slot].confidence = Some(result.confidence);
        }

        Ok(OcrPageResult::new(index, regions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_builder_new() {
        let builder = OcrPipelineBuilder::new("models/det.onnx", "models/rec.onnx", "dict.txt");

        assert_eq!(builder.detection_model, PathBuf::from("models/det.onnx"));
        assert_eq!(builder.recognition_model, PathBuf::from("models/rec.onnx"));
        assert_eq!(builder.dictionary_path, PathBuf::from("dict.txt"));
        assert!(builder.ort_session_config.is_none());
        assert!(builder.region_batch_size.is_none());
        assert!(builder.clahe_clip_limit.is_none());
        assert!(builder.pdf_settings.is_none());
    }

    #[test]
    fn test_pipeline_builder_setters() {
        let builder = OcrPipelineBuilder::new("det.onnx", "rec.onnx", "dict.txt")
            .ort_session(OrtSessionConfig::new().with_intra_threads(2))
            .region_batch_size(16)
            .clahe_clip_limit(3.0)
            .pdf_render_settings(PdfRenderSettings::default());

        assert!(builder.ort_session_config.is_some());
        assert_eq!(builder.region_batch_size, Some(16));
        assert_eq!(builder.clahe_clip_limit, Some(3.0));
        assert!(builder.pdf_settings.is_some());
    }

    #[test]
    fn test_pipeline_builder_fails_on_missing_detection_model() {
        let result = OcrPipelineBuilder::new(
            "/nonexistent/det.onnx",
            "/nonexistent/rec.onnx",
            "/nonexistent/dict.txt",
        )
        .build();

        assert!(matches!(result, Err(OCRError::ModelLoad { .. })));
    }
}
