//! Neural model wrappers for the OCR pipeline.
//!
//! Each model couples an ONNX Runtime session with the preprocessing and
//! postprocessing stages it needs, exposing a typed prediction API.

pub mod ctc_recognizer;
pub mod db_detector;

pub use ctc_recognizer::{CtcRecognizer, CtcRecognizerBuilder, RecognizedText};
pub use db_detector::{DbDetector, DbDetectorBuilder};
