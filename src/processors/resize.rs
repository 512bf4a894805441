//! Image resizing for detection and recognition preprocessing.
//!
//! Detection resizes whole pages so the longer side stays within a limit and
//! both dimensions are multiples of 32, as the DB network requires.
//! Recognition resizes cropped text regions to the fixed input height of the
//! CTC network with a proportional, clamped width.

use image::RgbImage;
use image::imageops::FilterType;

use crate::core::errors::{OCRError, OcrResult};
use crate::processors::types::ImageScaleInfo;

/// Resizes images for the text detection model.
#[derive(Debug, Clone)]
pub struct DetResize {
    /// Upper limit for the longer image side.
    pub limit_side_len: u32,
}

impl Default for DetResize {
    fn default() -> Self {
        Self {
            limit_side_len: 960,
        }
    }
}

impl DetResize {
    /// Creates a resizer with the given longer-side limit.
    pub fn new(limit_side_len: u32) -> Self {
        Self { limit_side_len }
    }

    /// Resizes an image for detection and records the applied ratios.
    ///
    /// Both output dimensions are rounded to the nearest multiple of 32 with
    /// a floor of 32, so the recorded ratios are the ones actually applied
    /// rather than the requested scale.
    pub fn apply(&self, image: &RgbImage) -> OcrResult<(RgbImage, ImageScaleInfo)> {
        let (src_w, src_h) = image.dimensions();
        if src_w == 0 || src_h == 0 {
            return Err(OCRError::invalid_input(
                "cannot resize an image with zero width or height",
            ));
        }

        let (h, w) = (src_h as f32, src_w as f32);
        let limit = self.limit_side_len as f32;
        let ratio = if h.max(w) > limit {
            limit / h.max(w)
        } else {
            1.0
        };

        let resize_h = round_to_multiple_of_32(h * ratio);
        let resize_w = round_to_multiple_of_32(w * ratio);

        let resized = if (resize_w, resize_h) == (src_w, src_h) {
            image.clone()
        } else {
            image::imageops::resize(image, resize_w, resize_h, FilterType::Lanczos3)
        };

        let scale_info = ImageScaleInfo::new(h, w, resize_h as f32 / h, resize_w as f32 / w);
        Ok((resized, scale_info))
    }
}

/// Resizes cropped text regions for the recognition model.
#[derive(Debug, Clone)]
pub struct RecResize {
    /// Fixed input height of the recognition network.
    pub img_height: u32,
    /// Minimum output width.
    pub min_width: u32,
    /// Maximum output width.
    pub max_width: u32,
}

impl Default for RecResize {
    fn default() -> Self {
        Self {
            img_height: 48,
            min_width: 4,
            max_width: 320,
        }
    }
}

impl RecResize {
    /// Resizes a text crop to the recognition input height, scaling the
    /// width proportionally and clamping it to `[min_width, max_width]`.
    pub fn apply(&self, image: &RgbImage) -> OcrResult<RgbImage> {
        let (src_w, src_h) = image.dimensions();
        if src_w == 0 || src_h == 0 {
            return Err(OCRError::invalid_input(
                "cannot resize an empty text crop",
            ));
        }

        let aspect = src_w as f32 / src_h as f32;
        let target_w = ((self.img_height as f32 * aspect).round() as u32)
            .clamp(self.min_width, self.max_width);

        Ok(image::imageops::resize(
            image,
            target_w,
            self.img_height,
            FilterType::Lanczos3,
        ))
    }
}

/// Rounds a dimension to the nearest multiple of 32, flooring at 32.
fn round_to_multiple_of_32(value: f32) -> u32 {
    (((value / 32.0).round() as u32) * 32).max(32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn test_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([100, 150, 200]))
    }

    #[test]
    fn det_resize_produces_multiples_of_32() {
        let resizer = DetResize::default();
        let (resized, _) = resizer.apply(&test_image(100, 50)).expect("resize");
        assert_eq!(resized.width() % 32, 0);
        assert_eq!(resized.height() % 32, 0);
        assert_eq!(resized.dimensions(), (96, 64));
    }

    #[test]
    fn det_resize_caps_longer_side() {
        let resizer = DetResize::default();
        let (resized, info) = resizer.apply(&test_image(4000, 1000)).expect("resize");
        assert!(resized.width() <= 960);
        assert_eq!(resized.width() % 32, 0);
        assert_eq!(resized.height() % 32, 0);
        assert!((info.ratio_w - resized.width() as f32 / 4000.0).abs() < 1e-6);
        assert!((info.ratio_h - resized.height() as f32 / 1000.0).abs() < 1e-6);
    }

    #[test]
    fn det_resize_keeps_small_image_near_original() {
        let resizer = DetResize::default();
        let (resized, info) = resizer.apply(&test_image(64, 64)).expect("resize");
        assert_eq!(resized.dimensions(), (64, 64));
        assert_eq!(info.ratio_h, 1.0);
        assert_eq!(info.ratio_w, 1.0);
    }

    #[test]
    fn det_resize_floors_tiny_dimension_at_32() {
        let resizer = DetResize::default();
        let (resized, _) = resizer.apply(&test_image(10, 10)).expect("resize");
        assert_eq!(resized.dimensions(), (32, 32));
    }

    #[test]
    fn det_resize_rejects_empty_image() {
        let resizer = DetResize::default();
        assert!(resizer.apply(&RgbImage::new(0, 0)).is_err());
    }

    #[test]
    fn rec_resize_fixes_height_and_scales_width() {
        let resizer = RecResize::default();
        let resized = resizer.apply(&test_image(200, 50)).expect("resize");
        assert_eq!(resized.height(), 48);
        assert_eq!(resized.width(), 192);
    }

    #[test]
    fn rec_resize_clamps_width() {
        let resizer = RecResize::default();

        let wide = resizer.apply(&test_image(5000, 50)).expect("resize");
        assert_eq!(wide.width(), 320);

        let narrow = resizer.apply(&test_image(1, 100)).expect("resize");
        assert_eq!(narrow.width(), 4);
        assert_eq!(narrow.height(), 48);
    }
}
