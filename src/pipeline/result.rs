//! Result types for the OCR pipeline.

use crate::processors::BoundingBox;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A text region containing detection and recognition results.
///
/// This struct groups together all the information related to a single
/// detected text line: the bounding box, the recognized text, and the
/// confidence score. `text` is `None` when the region was detected but
/// could not be recognized (for example when cropping failed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRegion {
    /// The bounding box of the detected text region.
    pub bounding_box: BoundingBox,
    /// The recognized text, if recognition was successful.
    pub text: Option<Arc<str>>,
    /// The confidence score for the recognized text.
    pub confidence: Option<f32>,
}

impl TextRegion {
    /// Creates a new TextRegion with the given bounding box.
    ///
    /// The text and confidence are initially set to None.
    pub fn new(bounding_box: BoundingBox) -> Self {
        Self {
            bounding_box,
            text: None,
            confidence: None,
        }
    }

    /// Creates a new TextRegion with detection and recognition results.
    pub fn with_recognition(
        bounding_box: BoundingBox,
        text: Option<Arc<str>>,
        confidence: Option<f32>,
    ) -> Self {
        Self {
            bounding_box,
            text,
            confidence,
        }
    }

    /// Returns true if this text region has recognized text.
    pub fn has_text(&self) -> bool {
        self.text.is_some()
    }

    /// Returns the text and confidence as a tuple if both are available.
    pub fn text_with_confidence(&self) -> Option<(&str, f32)> {
        match (&self.text, self.confidence) {
            (Some(text), Some(confidence)) => Some((text, confidence)),
            _ => None,
        }
    }
}

/// OCR results for a single page.
///
/// Bounding boxes are in the coordinate system of the image that was fed to
/// the pipeline (for PDF pages, the rasterized page image).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrPageResult {
    /// 0-based page index (0 for single-image processing).
    pub index: usize,
    /// Structured text regions in detection order.
    pub text_regions: Vec<TextRegion>,
}

impl OcrPageResult {
    /// Creates a page result from text regions.
    pub fn new(index: usize, text_regions: Vec<TextRegion>) -> Self {
        Self {
            index,
            text_regions,
        }
    }

    /// Returns an iterator over text regions that have recognized text.
    pub fn recognized_text_regions(&self) -> impl Iterator<Item = &TextRegion> {
        self.text_regions.iter().filter(|region| region.has_text())
    }

    /// Returns the number of text regions that have recognized text.
    pub fn recognized_text_count(&self) -> usize {
        self.recognized_text_regions().count()
    }

    /// Returns the average confidence score of all recognized text regions.
    pub fn average_confidence(&self) -> Option<f32> {
        let scores: Vec<f32> = self
            .text_regions
            .iter()
            .filter_map(|region| region.confidence)
            .collect();
        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f32>() / scores.len() as f32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::BoundingBox;

    fn region(text: Option<&str>, confidence: Option<f32>) -> TextRegion {
        TextRegion::with_recognition(
            BoundingBox::from_coords(0.0, 0.0, 10.0, 10.0),
            text.map(Arc::from),
            confidence,
        )
    }

    #[test]
    fn test_text_region_helpers() {
        let recognized = region(Some("xin chào"), Some(0.93));
        assert!(recognized.has_text());
        assert_eq!(recognized.text_with_confidence(), Some(("xin chào", 0.93)));

        let unrecognized = TextRegion::new(BoundingBox::from_coords(0.0, 0.0, 5.0, 5.0));
        assert!(!unrecognized.has_text());
        assert!(unrecognized.text_with_confidence().is_none());
    }

    #[test]
    fn test_page_result_counts_and_average() {
        let page = OcrPageResult::new(
            0,
            vec![
                region(Some("a"), Some(0.8)),
                region(None, None),
                region(Some("b"), Some(0.6)),
            ],
        );

        assert_eq!(page.recognized_text_count(), 2);
        let avg = page.average_confidence().expect("average");
        assert!((avg - 0.7).abs() < 1e-6);

        let empty = OcrPageResult::new(1, Vec::new());
        assert_eq!(empty.recognized_text_count(), 0);
        assert!(empty.average_confidence().is_none());
    }

    #[test]
    fn test_text_region_serializes_text_and_confidence() {
        let json = serde_json::to_value(region(Some("việt"), Some(0.5))).expect("serialize");
        assert_eq!(json["text"], "việt");
        assert_eq!(json["confidence"], 0.5);
    }
}
