//! CLI mode for OCR processing.

use crate::config::OcrConfig;
use crate::ocr::OcrEngine;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Run OCR on a local file and print the result to stdout
pub fn process_file(
    path: &Path,
    config: &OcrConfig,
    output_format: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let start = Instant::now();

    info!("Initializing OCR engine...");
    let engine = OcrEngine::new(config)?;
    info!(
        "Engine initialized in {:.2}ms",
        start.elapsed().as_secs_f64() * 1000.0
    );

    let ocr_start = Instant::now();
    match output_format {
        "json" => {
            let report = engine.process_file_report(path)?;
            info!(
                "OCR completed in {:.2}ms",
                ocr_start.elapsed().as_secs_f64() * 1000.0
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            let text = engine.process_file(path)?;
            info!(
                "OCR completed in {:.2}ms",
                ocr_start.elapsed().as_secs_f64() * 1000.0
            );
            println!("{text}");
        }
    }

    Ok(())
}
