//! Types used in image processing operations
//!
//! This module defines enums and small structs shared by the preprocessing
//! and post-processing steps of the OCR pipeline.

/// Specifies the color channel order in an image
#[derive(Debug, Clone, Copy, Default)]
pub enum ColorOrder {
    /// Red, Green, Blue order (default for most image libraries like PIL, image-rs)
    #[default]
    RGB,
    /// Blue, Green, Red order (used by OpenCV and PaddlePaddle models)
    BGR,
}

/// Information about image scaling during preprocessing
///
/// This struct captures the original dimensions and scaling ratios applied
/// during image resizing operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageScaleInfo {
    /// Original image height before resizing
    pub src_h: f32,
    /// Original image width before resizing
    pub src_w: f32,
    /// Height scaling ratio (resized_height / original_height)
    pub ratio_h: f32,
    /// Width scaling ratio (resized_width / original_width)
    pub ratio_w: f32,
}

impl ImageScaleInfo {
    /// Creates a new `ImageScaleInfo` from original dimensions and ratios
    pub fn new(src_h: f32, src_w: f32, ratio_h: f32, ratio_w: f32) -> Self {
        Self {
            src_h,
            src_w,
            ratio_h,
            ratio_w,
        }
    }
}
