//! Image normalization utilities for OCR processing.
//!
//! This module converts images to normalized f32 tensors in NCHW layout for
//! model input, with configurable scale, mean, standard deviation, and color
//! order.

use crate::core::errors::OCRError;
use crate::core::Tensor4D;
use crate::processors::types::ColorOrder;
use image::RgbImage;

/// Normalizes images into model input tensors.
///
/// The per-channel affine transform is precomputed as `alpha = scale / std`
/// and `beta = -mean / std`, so each pixel becomes `value * alpha + beta`.
#[derive(Debug)]
pub struct NormalizeImage {
    /// Scaling factors for each channel (alpha = scale / std)
    pub alpha: Vec<f32>,
    /// Offset values for each channel (beta = -mean / std)
    pub beta: Vec<f32>,
    /// Color channel order (RGB or BGR)
    pub color_order: ColorOrder,
}

impl NormalizeImage {
    /// Creates a new NormalizeImage instance with the specified parameters.
    ///
    /// # Arguments
    ///
    /// * `scale` - Optional scaling factor (defaults to 1.0/255.0)
    /// * `mean` - Optional mean values per channel (defaults to ImageNet RGB means)
    /// * `std` - Optional standard deviations per channel (defaults to ImageNet RGB stds)
    /// * `color_order` - Optional color order (defaults to RGB)
    ///
    /// `mean` and `std` are interpreted in the output channel order given by
    /// `color_order`: for BGR pass them as `[B, G, R]`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if scale is not positive, mean or std do
    /// not have exactly 3 elements, any std is not positive, or any value is
    /// not finite.
    pub fn new(
        scale: Option<f32>,
        mean: Option<Vec<f32>>,
        std: Option<Vec<f32>>,
        color_order: Option<ColorOrder>,
    ) -> Result<Self, OCRError> {
        let scale = scale.unwrap_or(1.0 / 255.0);
        let mean = mean.unwrap_or_else(|| vec![0.485, 0.456, 0.406]);
        let std = std.unwrap_or_else(|| vec![0.229, 0.224, 0.225]);
        let color_order = color_order.unwrap_or_default();

        if !scale.is_finite() || scale <= 0.0 {
            return Err(OCRError::ConfigError {
                message: format!("Scale must be positive and finite, got {scale}"),
            });
        }

        if mean.len() != 3 {
            return Err(OCRError::ConfigError {
                message: "Mean must have exactly 3 elements (3-channel normalization)".to_string(),
            });
        }

        if std.len() != 3 {
            return Err(OCRError::ConfigError {
                message: "Std must have exactly 3 elements (3-channel normalization)".to_string(),
            });
        }

        for (i, &m) in mean.iter().enumerate() {
            if !m.is_finite() {
                return Err(OCRError::ConfigError {
                    message: format!("Mean at index {i} must be finite, got {m}"),
                });
            }
        }

        for (i, &s) in std.iter().enumerate() {
            if !s.is_finite() || s <= 0.0 {
                return Err(OCRError::ConfigError {
                    message: format!(
                        "Standard deviation at index {i} must be positive and finite, got {s}"
                    ),
                });
            }
        }

        let alpha: Vec<f32> = std.iter().map(|s| scale / s).collect();
        let beta: Vec<f32> = mean.iter().zip(&std).map(|(m, s)| -m / s).collect();

        Ok(Self {
            alpha,
            beta,
            color_order,
        })
    }

    /// Creates a normalizer for CTC text recognition input.
    ///
    /// Maps pixel values into `[-1, 1]` (scale 2/255, mean 1, std 1) with
    /// BGR channel order, matching PaddlePaddle-exported recognition models.
    pub fn for_ocr_recognition() -> Result<Self, OCRError> {
        Self::new(
            Some(2.0 / 255.0),
            Some(vec![1.0, 1.0, 1.0]),
            Some(vec![1.0, 1.0, 1.0]),
            Some(ColorOrder::BGR),
        )
    }

    /// Creates an ImageNet-style RGB normalizer (mean/std in RGB order).
    pub fn imagenet_rgb() -> Result<Self, OCRError> {
        Self::new(
            None,
            Some(vec![0.485, 0.456, 0.406]),
            Some(vec![0.229, 0.224, 0.225]),
            Some(ColorOrder::RGB),
        )
    }

    /// Normalizes a single image into an NCHW tensor with batch size 1.
    pub fn normalize_to(&self, img: &RgbImage) -> Result<Tensor4D, OCRError> {
        let (width, height) = img.dimensions();
        let channels = 3u32;

        // Map output channel index to source pixel index
        // RGB: c=0->R, c=1->G, c=2->B (same as pixel layout)
        // BGR: c=0->B, c=1->G, c=2->R (swap R and B)
        let src_channels: [usize; 3] = match self.color_order {
            ColorOrder::RGB => [0, 1, 2],
            ColorOrder::BGR => [2, 1, 0],
        };

        let mut result = vec![0.0f32; (channels * height * width) as usize];

        for (c, &src_c) in src_channels.iter().enumerate() {
            for y in 0..height {
                for x in 0..width {
                    let pixel = img.get_pixel(x, y);
                    let channel_value = pixel[src_c] as f32;
                    let dst_idx = c * (height * width) as usize + (y * width + x) as usize;
                    result[dst_idx] = channel_value * self.alpha[c] + self.beta[c];
                }
            }
        }

        ndarray::Array4::from_shape_vec(
            (1, channels as usize, height as usize, width as usize),
            result,
        )
        .map_err(|e| {
            OCRError::tensor_operation(
                format!("failed to create normalization tensor for {width}x{height} image"),
                e,
            )
        })
    }
}
