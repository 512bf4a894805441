//! CTC text recognition model.
//!
//! This module wraps an ONNX CTC recognition session together with its
//! character dictionary and preprocessing stages. Crops are recognized in
//! aspect-ratio-sorted batches so that padding inside each batch stays small,
//! and results are returned in the caller's original order.

use crate::core::inference::OrtInfer;
use crate::core::{OCRError, OcrResult, OrtSessionConfig, Tensor4D};
use crate::processors::{NormalizeImage, RecResize};
use image::RgbImage;
use ndarray::{ArrayView1, ArrayView2, Axis, Ix3, s};
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Recognized text with confidence score.
#[derive(Debug, Clone)]
pub struct RecognizedText {
    /// The recognized text content.
    pub text: String,
    /// Mean probability of the emitted characters (0.0 when nothing was emitted).
    pub confidence: f32,
}

impl RecognizedText {
    /// Creates a new recognized text result.
    pub fn new(text: String, confidence: f32) -> Self {
        Self { text, confidence }
    }

    /// Checks whether the text is empty or whitespace only.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// CTC text recognizer.
///
/// Recognizes single text lines from cropped images using greedy CTC
/// decoding over a per-timestep character distribution. Index 0 of the
/// dictionary is the CTC blank; a space character is appended at load to
/// match the model's final class.
#[derive(Debug)]
pub struct CtcRecognizer {
    inference: OrtInfer,
    resizer: RecResize,
    normalizer: NormalizeImage,
    dictionary: Vec<String>,
    batch_size: usize,
}

impl CtcRecognizer {
    /// Creates a new builder for the text recognizer.
    pub fn builder() -> CtcRecognizerBuilder {
        CtcRecognizerBuilder::new()
    }

    /// Returns the number of entries in the character dictionary.
    pub fn dictionary_size(&self) -> usize {
        self.dictionary.len()
    }

    /// Recognizes a single cropped text line.
    pub fn predict(&self, crop: &RgbImage) -> OcrResult<RecognizedText> {
        let mut results = self.predict_batch(std::slice::from_ref(crop))?;
        results
            .pop()
            .ok_or_else(|| OCRError::invalid_input("recognition produced no output"))
    }

    /// Recognizes a batch of cropped text lines.
    ///
    /// Crops are grouped by aspect ratio before inference; the returned
    /// results are in the same order as the input slice. A batched inference
    /// that fails with a session error is retried one crop at a time before
    /// the error is propagated.
    pub fn predict_batch(&self, crops: &[RgbImage]) -> OcrResult<Vec<RecognizedText>> {
        if crops.is_empty() {
            return Ok(Vec::new());
        }

        let order = Self::indices_by_aspect_ratio(crops);

        let mut results = vec![RecognizedText::new(String::new(), 0.0); crops.len()];
        for chunk in order.chunks(self.batch_size) {
            let batch = self.preprocess_chunk(crops, chunk)?;
            let decoded = match self.inference.run(batch) {
                Ok(output) => self.decode_output(&output)?,
                Err(err @ (OCRError::Inference { .. } | OCRError::Session(_)))
                    if chunk.len() > 1 =>
                {
                    tracing::warn!(
                        batch = chunk.len(),
                        error = %err,
                        "batched recognition failed, retrying crops one at a time"
                    );
                    self.recognize_singly(crops, chunk)?
                }
                Err(err) => return Err(err),
            };

            if decoded.len() != chunk.len() {
                return Err(OCRError::invalid_input(format!(
                    "recognition returned {} results for {} crops",
                    decoded.len(),
                    chunk.len()
                )));
            }
            for (&slot, recognized) in chunk.iter().zip(decoded) {
                results[slot] = recognized;
            }
        }

        Ok(results)
    }

    /// Runs the chunk's crops through inference one at a time.
    fn recognize_singly(&self, crops: &[RgbImage], chunk: &[usize]) -> OcrResult<Vec<RecognizedText>> {
        chunk
            .iter()
            .map(|&idx| {
                let tensor = self.preprocess_chunk(crops, &[idx])?;
                let output = self.inference.run(tensor)?;
                self.decode_output(&output)?
                    .pop()
                    .ok_or_else(|| OCRError::invalid_input("recognition produced no output"))
            })
            .collect()
    }

    /// Returns crop indices sorted by width/height ratio, ascending.
    fn indices_by_aspect_ratio(crops: &[RgbImage]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..crops.len()).collect();
        order.sort_by(|&a, &b| {
            let ratio_a = crops[a].width() as f32 / crops[a].height().max(1) as f32;
            let ratio_b = crops[b].width() as f32 / crops[b].height().max(1) as f32;
            ratio_a
                .partial_cmp(&ratio_b)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        order
    }

    /// Resizes and normalizes the chunk's crops, right-padding each with
    /// zeros to the widest resized width in the chunk.
    fn preprocess_chunk(&self, crops: &[RgbImage], chunk: &[usize]) -> OcrResult<Tensor4D> {
        let tensors: Vec<Tensor4D> = chunk
            .par_iter()
            .map(|&idx| {
                let resized = self.resizer.apply(&crops[idx])?;
                self.normalizer.normalize_to(&resized)
            })
            .collect::<OcrResult<Vec<_>>>()?;

        let height = self.resizer.img_height as usize;
        let target_width = tensors
            .iter()
            .map(|t| t.shape()[3])
            .max()
            .unwrap_or(self.resizer.min_width as usize);

        let mut batch = Tensor4D::zeros((tensors.len(), 3, height, target_width));
        for (i, tensor) in tensors.iter().enumerate() {
            let width = tensor.shape()[3];
            batch
                .slice_mut(s![i, .., .., ..width])
                .assign(&tensor.index_axis(Axis(0), 0));
        }

        Ok(batch)
    }

    /// Decodes a `[batch, seq_len, num_classes]` probability tensor.
    fn decode_output(&self, output: &ndarray::ArrayD<f32>) -> OcrResult<Vec<RecognizedText>> {
        let output = output.view().into_dimensionality::<Ix3>().map_err(|e| {
            OCRError::tensor_operation("recognition output is not [batch, seq, classes]", e)
        })?;

        Ok((0..output.shape()[0])
            .map(|n| {
                let probs = output.index_axis(Axis(0), n);
                Self::ctc_greedy_decode(&probs, &self.dictionary)
            })
            .collect())
    }

    /// Greedy CTC decoding: argmax per timestep, skip blanks (index 0),
    /// collapse adjacent repeats. Confidence is the mean probability of the
    /// emitted characters.
    fn ctc_greedy_decode(probs: &ArrayView2<f32>, dictionary: &[String]) -> RecognizedText {
        let mut text = String::new();
        let mut emitted = Vec::new();
        let mut prev_index: Option<usize> = None;

        for row in probs.axis_iter(Axis(0)) {
            let (max_index, max_prob) = Self::argmax(&row);

            if max_index != 0 && Some(max_index) != prev_index {
                if let Some(entry) = dictionary.get(max_index) {
                    text.push_str(entry);
                    emitted.push(max_prob);
                }
            }

            prev_index = if max_index == 0 { None } else { Some(max_index) };
        }

        let confidence = if emitted.is_empty() {
            0.0
        } else {
            emitted.iter().sum::<f32>() / emitted.len() as f32
        };

        RecognizedText::new(text, confidence)
    }

    fn argmax(row: &ArrayView1<f32>) -> (usize, f32) {
        let mut max_index = 0;
        let mut max_prob = f32::NEG_INFINITY;
        for (i, &prob) in row.iter().enumerate() {
            if prob > max_prob {
                max_prob = prob;
                max_index = i;
            }
        }
        (max_index, max_prob)
    }

    /// Loads the character dictionary: one character per line, index 0
    /// reserved for the CTC blank, a space appended as the final class.
    fn load_dictionary(path: &Path) -> OcrResult<Vec<String>> {
        let file = File::open(path).map_err(|e| {
            OCRError::config_error_detailed(
                "recognition dictionary",
                format!("cannot open {}: {}", path.display(), e),
            )
        })?;

        let reader = BufReader::new(file);
        let mut characters = vec![String::new()];
        for line in reader.lines() {
            let line = line?;
            characters.push(line.trim_end_matches('\r').to_string());
        }

        if characters.len() == 1 {
            return Err(OCRError::config_error_detailed(
                "recognition dictionary",
                "dictionary file is empty",
            ));
        }

        characters.push(" ".to_string());
        Ok(characters)
    }
}

/// Builder for [`CtcRecognizer`].
#[derive(Debug)]
pub struct CtcRecognizerBuilder {
    batch_size: usize,
    session_config: OrtSessionConfig,
}

impl CtcRecognizerBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            batch_size: 6,
            session_config: OrtSessionConfig::default(),
        }
    }

    /// Sets how many crops are recognized per inference call.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the ONNX Runtime session configuration.
    pub fn session_config(mut self, config: OrtSessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Builds the recognizer, loading the model and dictionary from disk.
    pub fn build<P: AsRef<Path>>(self, model_path: P, dict_path: P) -> OcrResult<CtcRecognizer> {
        let dictionary = CtcRecognizer::load_dictionary(dict_path.as_ref())?;
        tracing::debug!(
            "loaded recognition dictionary with {} entries",
            dictionary.len()
        );

        let inference =
            OrtInfer::from_file(model_path.as_ref(), &self.session_config, "ctc_recognizer")?;
        let normalizer = NormalizeImage::for_ocr_recognition()?;

        Ok(CtcRecognizer {
            inference,
            resizer: RecResize::default(),
            normalizer,
            dictionary,
            batch_size: self.batch_size.max(1),
        })
    }
}

impl Default for CtcRecognizerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
