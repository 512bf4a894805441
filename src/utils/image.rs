//! Image loading and conversion helpers.

use crate::core::OcrResult;
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use std::path::Path;

/// Loads an image from disk and converts it to RGB.
///
/// Decoding failures (unsupported format, truncated file, missing file)
/// surface as [`crate::core::OCRError::ImageLoad`].
pub fn load_image(path: &Path) -> OcrResult<RgbImage> {
    let img = image::open(path)?;
    Ok(dynamic_to_rgb(img))
}

/// Converts a dynamic image into an owned RGB image.
pub fn dynamic_to_rgb(img: DynamicImage) -> RgbImage {
    img.into_rgb8()
}

/// Replicates a single-channel image into a 3-channel RGB image.
///
/// Detection models take 3-channel input, so grayscale preprocessing output
/// is expanded by copying the luma value into every channel.
pub fn gray_to_rgb(gray: &GrayImage) -> RgbImage {
    RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y).0[0];
        Rgb([v, v, v])
    })
}
