//! Utility functions for the OCR pipeline.
//!
//! This module provides image loading and conversion helpers, bounding box
//! based cropping used between detection and recognition, and tracing setup.

pub mod bbox_crop;
pub mod image;
pub mod logging;

// Re-export image helpers
pub use image::{dynamic_to_rgb, gray_to_rgb, load_image};

// Re-export cropping utilities
pub use bbox_crop::BBoxCrop;

// Re-export logging setup
pub use logging::init_tracing;
