//! Image processors for the OCR pipeline.
//!
//! This module provides the preprocessing and postprocessing stages that
//! surround model inference: resizing, contrast enhancement, normalization,
//! geometric primitives, and DB detection postprocessing.

pub mod contrast;
pub mod db_postprocess;
pub mod geometry;
pub mod normalization;
pub mod resize;
pub mod types;

// Re-export geometric primitives
pub use geometry::{BoundingBox, MinAreaRect, Point};

// Re-export processor stages
pub use contrast::{Clahe, enhance_for_detection};
pub use db_postprocess::DBPostProcess;
pub use normalization::NormalizeImage;
pub use resize::{DetResize, RecResize};

// Re-export shared processor types
pub use types::{ColorOrder, ImageScaleInfo};
