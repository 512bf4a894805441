//! DB text detection model.
//!
//! This module wraps an ONNX DB (Differentiable Binarization) session
//! together with the resize, normalization, and postprocessing stages it
//! needs, exposing a single-image prediction API.

use crate::core::inference::OrtInfer;
use crate::core::{OCRError, OcrResult, OrtSessionConfig, Tensor4D};
use crate::processors::{BoundingBox, DBPostProcess, DetResize, ImageScaleInfo, NormalizeImage};
use image::RgbImage;
use ndarray::Ix4;
use std::path::Path;

/// DB (Differentiable Binarization) text detector.
///
/// Produces text-line bounding boxes in contour discovery order. An image
/// without any text yields an empty list, not an error.
#[derive(Debug)]
pub struct DbDetector {
    inference: OrtInfer,
    resizer: DetResize,
    normalizer: NormalizeImage,
    postprocessor: DBPostProcess,
}

impl DbDetector {
    /// Creates a new builder for the text detector.
    pub fn builder() -> DbDetectorBuilder {
        DbDetectorBuilder::new()
    }

    /// Detects text regions in the given image.
    ///
    /// # Arguments
    /// * `image` - Source RGB image.
    ///
    /// # Returns
    /// Bounding boxes in source-image coordinates, in detection order.
    pub fn predict(&self, image: &RgbImage) -> OcrResult<Vec<BoundingBox>> {
        let (tensor, scale_info) = self.preprocess(image)?;
        let pred = self.infer(tensor)?;
        Ok(self.postprocess(&pred, &scale_info))
    }

    /// Resizes and normalizes the image into a batch tensor of one.
    fn preprocess(&self, image: &RgbImage) -> OcrResult<(Tensor4D, ImageScaleInfo)> {
        let (resized, scale_info) = self.resizer.apply(image)?;
        let tensor = self.normalizer.normalize_to(&resized)?;
        Ok((tensor, scale_info))
    }

    fn infer(&self, tensor: Tensor4D) -> OcrResult<Tensor4D> {
        let output = self.inference.run(tensor)?;
        output
            .into_dimensionality::<Ix4>()
            .map_err(|e| OCRError::tensor_operation("detection output is not a 4D heatmap", e))
    }

    fn postprocess(&self, pred: &Tensor4D, scale_info: &ImageScaleInfo) -> Vec<BoundingBox> {
        let (mut boxes, _scores) = self
            .postprocessor
            .apply(pred, std::slice::from_ref(scale_info));
        boxes.pop().unwrap_or_default()
    }
}

/// Builder for [`DbDetector`].
#[derive(Debug)]
pub struct DbDetectorBuilder {
    limit_side_len: u32,
    thresh: f32,
    box_thresh: f32,
    unclip_ratio: f32,
    max_candidates: usize,
    use_dilation: bool,
    session_config: OrtSessionConfig,
}

impl DbDetectorBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            limit_side_len: 960,
            thresh: 0.3,
            box_thresh: 0.6,
            unclip_ratio: 1.5,
            max_candidates: 1000,
            use_dilation: false,
            session_config: OrtSessionConfig::default(),
        }
    }

    /// Sets the resize limit for the longer image side.
    pub fn limit_side_len(mut self, len: u32) -> Self {
        self.limit_side_len = len;
        self
    }

    /// Sets the heatmap binarization threshold.
    pub fn thresh(mut self, thresh: f32) -> Self {
        self.thresh = thresh;
        self
    }

    /// Sets the box score threshold.
    pub fn box_thresh(mut self, thresh: f32) -> Self {
        self.box_thresh = thresh;
        self
    }

    /// Sets the unclip ratio.
    pub fn unclip_ratio(mut self, ratio: f32) -> Self {
        self.unclip_ratio = ratio;
        self
    }

    /// Sets the maximum number of candidate boxes.
    pub fn max_candidates(mut self, max: usize) -> Self {
        self.max_candidates = max;
        self
    }

    /// Enables mask dilation before contour extraction.
    pub fn use_dilation(mut self, enabled: bool) -> Self {
        self.use_dilation = enabled;
        self
    }

    /// Sets the ONNX Runtime session configuration.
    pub fn session_config(mut self, config: OrtSessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Builds the detector, loading the ONNX model from the given path.
    pub fn build<P: AsRef<Path>>(self, model_path: P) -> OcrResult<DbDetector> {
        let inference =
            OrtInfer::from_file(model_path.as_ref(), &self.session_config, "db_detector")?;
        let normalizer = NormalizeImage::imagenet_rgb()?;

        Ok(DbDetector {
            inference,
            resizer: DetResize::new(self.limit_side_len),
            normalizer,
            postprocessor: DBPostProcess::new(
                Some(self.thresh),
                Some(self.box_thresh),
                Some(self.max_candidates),
                Some(self.unclip_ratio),
                Some(self.use_dilation),
            ),
        })
    }
}

impl Default for DbDetectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
