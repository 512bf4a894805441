//! Post-processing for DB (Differentiable Binarization) text detection models.
//!
//! The [`DBPostProcess`] struct converts raw detection heatmaps into geometric
//! bounding boxes by thresholding, contour extraction, minimum-area-rectangle
//! fitting, scoring, and expansion back to source-image coordinates.

use crate::core::Tensor4D;
use crate::processors::geometry::{BoundingBox, MinAreaRect, Point};
use crate::processors::types::ImageScaleInfo;
use image::{GrayImage, Luma};
use imageproc::contours::find_contours;
use imageproc::distance_transform::Norm;
use imageproc::morphology;
use ndarray::{ArrayView2, Axis, s};

/// Post-processor for DB (Differentiable Binarization) text detection models.
#[derive(Debug)]
pub struct DBPostProcess {
    /// Threshold for binarizing the prediction map (default: 0.3).
    pub thresh: f32,
    /// Threshold for filtering bounding boxes based on their score (default: 0.6).
    pub box_thresh: f32,
    /// Maximum number of candidate bounding boxes to consider (default: 1000).
    pub max_candidates: usize,
    /// Ratio for unclipping (expanding) bounding boxes (default: 1.5).
    pub unclip_ratio: f32,
    /// Minimum side length for detected bounding boxes.
    pub min_size: f32,
    /// Whether to apply dilation to the segmentation mask before contour detection.
    pub use_dilation: bool,
}

impl DBPostProcess {
    /// Creates a new `DBPostProcess` instance with optional overrides.
    pub fn new(
        thresh: Option<f32>,
        box_thresh: Option<f32>,
        max_candidates: Option<usize>,
        unclip_ratio: Option<f32>,
        use_dilation: Option<bool>,
    ) -> Self {
        Self {
            thresh: thresh.unwrap_or(0.3),
            box_thresh: box_thresh.unwrap_or(0.6),
            max_candidates: max_candidates.unwrap_or(1000),
            unclip_ratio: unclip_ratio.unwrap_or(1.5),
            min_size: 3.0,
            use_dilation: use_dilation.unwrap_or(false),
        }
    }

    /// Applies post-processing to a batch of prediction maps.
    ///
    /// # Arguments
    /// * `preds` - Model predictions (batch of heatmaps)
    /// * `img_shapes` - Original image dimensions for each image in batch
    ///
    /// # Returns
    /// Tuple of (bounding_boxes, scores) for each image in batch, with boxes
    /// in contour discovery order.
    pub fn apply(
        &self,
        preds: &Tensor4D,
        img_shapes: &[ImageScaleInfo],
    ) -> (Vec<Vec<BoundingBox>>, Vec<Vec<f32>>) {
        let mut all_boxes = Vec::new();
        let mut all_scores = Vec::new();

        for (batch_idx, img_shape) in img_shapes.iter().enumerate() {
            let pred_slice = preds.index_axis(Axis(0), batch_idx);
            let pred_channel = pred_slice.index_axis(Axis(0), 0);

            let (boxes, scores) = self.process(&pred_channel, img_shape);
            all_boxes.push(boxes);
            all_scores.push(scores);
        }

        (all_boxes, all_scores)
    }

    fn process(
        &self,
        pred: &ArrayView2<f32>,
        img_shape: &ImageScaleInfo,
    ) -> (Vec<BoundingBox>, Vec<f32>) {
        let height = pred.shape()[0] as u32;
        let width = pred.shape()[1] as u32;

        tracing::debug!(
            "DBPostProcess: pred {}x{}, src {}x{} (dest dimensions)",
            height,
            width,
            img_shape.src_h,
            img_shape.src_w
        );

        // Create binary mask directly as GrayImage to avoid intermediate Vec<Vec<bool>>
        let mut mask_img = GrayImage::new(width, height);
        for y in 0..height as usize {
            for x in 0..width as usize {
                let pixel_value = if pred[[y, x]] > self.thresh { 255 } else { 0 };
                mask_img.put_pixel(x as u32, y as u32, Luma([pixel_value]));
            }
        }

        let mask_img = if self.use_dilation {
            Self::dilate_mask_img(&mask_img)
        } else {
            mask_img
        };

        self.boxes_from_bitmap(pred, &mask_img, img_shape)
    }

    /// Applies dilation to a binary mask using a Chebyshev radius of 1.
    fn dilate_mask_img(mask_img: &GrayImage) -> GrayImage {
        morphology::dilate(mask_img, Norm::LInf, 1)
    }

    /// Extracts quadrilateral boxes from a binarized segmentation mask.
    ///
    /// Each contour is reduced to its minimum-area rectangle, filtered on size
    /// and score, expanded by the unclip ratio, and finally rescaled from
    /// heatmap coordinates back to source-image coordinates.
    fn boxes_from_bitmap(
        &self,
        pred: &ArrayView2<f32>,
        mask: &GrayImage,
        img_shape: &ImageScaleInfo,
    ) -> (Vec<BoundingBox>, Vec<f32>) {
        let contours = find_contours::<u32>(mask);
        let num_contours = contours.len().min(self.max_candidates);

        let mut boxes = Vec::with_capacity(num_contours);
        let mut scores = Vec::with_capacity(num_contours);

        for contour in contours.iter().take(num_contours) {
            let candidate = BoundingBox::from_contour(contour);
            let rect = candidate.get_min_area_rect();
            if rect.min_side() < self.min_size {
                continue;
            }

            let rect_box = BoundingBox::new(rect.get_box_points());
            let score = Self::box_score_fast(pred, &rect_box);
            if score < self.box_thresh {
                continue;
            }

            let expanded = Self::unclip(&rect, self.unclip_ratio);
            if expanded.min_side() < self.min_size + 2.0 {
                continue;
            }

            let points = expanded
                .get_box_points()
                .into_iter()
                .map(|p| {
                    Point::new(
                        (p.x / img_shape.ratio_w)
                            .round()
                            .clamp(0.0, img_shape.src_w),
                        (p.y / img_shape.ratio_h)
                            .round()
                            .clamp(0.0, img_shape.src_h),
                    )
                })
                .collect();

            boxes.push(BoundingBox::new(points));
            scores.push(score);
        }

        (boxes, scores)
    }

    /// Expands a rectangle by the DB unclip distance `area * ratio / perimeter`.
    fn unclip(rect: &MinAreaRect, unclip_ratio: f32) -> MinAreaRect {
        let area = rect.width * rect.height;
        let perimeter = 2.0 * (rect.width + rect.height);
        let distance = area * unclip_ratio / perimeter;
        rect.expand(distance)
    }

    /// Scores a box by the mean prediction value inside its axis-aligned
    /// bounding region, clamped to the heatmap.
    fn box_score_fast(pred: &ArrayView2<f32>, bbox: &BoundingBox) -> f32 {
        let height = pred.shape()[0];
        let width = pred.shape()[1];
        if height == 0 || width == 0 {
            return 0.0;
        }

        let x_min = bbox.x_min().floor().clamp(0.0, (width - 1) as f32) as usize;
        let x_max = bbox.x_max().ceil().clamp(0.0, (width - 1) as f32) as usize;
        let y_min = bbox.y_min().floor().clamp(0.0, (height - 1) as f32) as usize;
        let y_max = bbox.y_max().ceil().clamp(0.0, (height - 1) as f32) as usize;

        let region = pred.slice(s![y_min..=y_max, x_min..=x_max]);
        region.mean().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heatmap_with_region(
        height: usize,
        width: usize,
        rows: std::ops::Range<usize>,
        cols: std::ops::Range<usize>,
        value: f32,
    ) -> Tensor4D {
        let mut pred = Tensor4D::zeros((1, 1, height, width));
        for y in rows {
            for x in cols.clone() {
                pred[[0, 0, y, x]] = value;
            }
        }
        pred
    }

    fn identity_shape(height: f32, width: f32) -> ImageScaleInfo {
        ImageScaleInfo::new(height, width, 1.0, 1.0)
    }

    #[test]
    fn test_blank_heatmap_yields_no_boxes() {
        let processor = DBPostProcess::new(None, None, None, None, None);
        let pred = Tensor4D::zeros((1, 1, 64, 64));
        let (boxes, scores) = processor.apply(&pred, &[identity_shape(64.0, 64.0)]);

        assert_eq!(boxes.len(), 1);
        assert!(boxes[0].is_empty());
        assert!(scores[0].is_empty());
    }

    #[test]
    fn test_single_region_produces_expanded_box() {
        let processor = DBPostProcess::new(None, None, None, None, None);
        let pred = heatmap_with_region(100, 100, 20..40, 10..60, 0.9);
        let (boxes, scores) = processor.apply(&pred, &[identity_shape(100.0, 100.0)]);

        assert_eq!(boxes[0].len(), 1);
        let bbox = &boxes[0][0];
        assert!((scores[0][0] - 0.9).abs() < 0.05, "score: {}", scores[0][0]);

        // The unclipped box must cover the original region with extra margin.
        assert!(bbox.x_min() < 10.0);
        assert!(bbox.x_max() > 59.0);
        assert!(bbox.y_min() < 20.0);
        assert!(bbox.y_max() > 39.0);

        // All coordinates stay inside the source image.
        for point in &bbox.points {
            assert!(point.x >= 0.0 && point.x <= 100.0);
            assert!(point.y >= 0.0 && point.y <= 100.0);
        }
    }

    #[test]
    fn test_low_score_region_is_filtered() {
        let processor = DBPostProcess::new(None, None, None, None, None);
        // Above the binarization threshold but below the box score threshold.
        let pred = heatmap_with_region(100, 100, 20..40, 10..60, 0.4);
        let (boxes, _) = processor.apply(&pred, &[identity_shape(100.0, 100.0)]);

        assert!(boxes[0].is_empty());
    }

    #[test]
    fn test_tiny_region_is_filtered_by_min_size() {
        let processor = DBPostProcess::new(None, None, None, None, None);
        let pred = heatmap_with_region(64, 64, 10..12, 10..12, 0.9);
        let (boxes, _) = processor.apply(&pred, &[identity_shape(64.0, 64.0)]);

        assert!(boxes[0].is_empty());
    }

    #[test]
    fn test_two_regions_keep_discovery_order() {
        let processor = DBPostProcess::new(None, None, None, None, None);
        let mut pred = heatmap_with_region(100, 120, 10..30, 10..40, 0.95);
        for y in 60..80 {
            for x in 50..90 {
                pred[[0, 0, y, x]] = 0.95;
            }
        }
        let (boxes, scores) = processor.apply(&pred, &[identity_shape(100.0, 120.0)]);

        assert_eq!(boxes[0].len(), 2);
        assert_eq!(scores[0].len(), 2);
        // Contours are discovered in raster order, so the upper region comes first.
        assert!(boxes[0][0].y_max() < boxes[0][1].y_min());
    }

    #[test]
    fn test_boxes_are_rescaled_to_source_coordinates() {
        let processor = DBPostProcess::new(None, None, None, None, None);
        let pred = heatmap_with_region(100, 100, 20..40, 10..60, 0.9);
        // Heatmap is half the source resolution in both dimensions.
        let shape = ImageScaleInfo::new(200.0, 200.0, 0.5, 0.5);
        let (boxes, _) = processor.apply(&pred, &[shape]);

        assert_eq!(boxes[0].len(), 1);
        let bbox = &boxes[0][0];
        assert!(bbox.x_max() > 118.0, "x_max: {}", bbox.x_max());
        assert!(bbox.y_max() > 78.0, "y_max: {}", bbox.y_max());
        for point in &bbox.points {
            assert!(point.x >= 0.0 && point.x <= 200.0);
            assert!(point.y >= 0.0 && point.y <= 200.0);
        }
    }

    #[test]
    fn test_dilation_grows_mask() {
        let mut mask = GrayImage::new(9, 9);
        mask.put_pixel(4, 4, Luma([255]));
        let dilated = DBPostProcess::dilate_mask_img(&mask);

        let white = dilated.pixels().filter(|p| p.0[0] == 255).count();
        assert_eq!(white, 9);
    }

    #[test]
    fn test_unclip_distance_matches_formula() {
        let rect = MinAreaRect {
            center: Point::new(50.0, 50.0),
            width: 40.0,
            height: 10.0,
            angle: 0.0,
        };
        let expanded = DBPostProcess::unclip(&rect, 1.5);

        // distance = (40 * 10) * 1.5 / (2 * 50) = 6.0
        assert!((expanded.width - 52.0).abs() < 1e-4);
        assert!((expanded.height - 22.0).abs() < 1e-4);
    }
}
