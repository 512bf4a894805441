//! PDF rasterization for the OCR pipeline.
//!
//! Converts each page of a PDF document into an [`RgbImage`] via PDFium.
//! Pages render at a fixed scale relative to their point size and are
//! downscaled when they exceed the configured dimension cap.

use image::{RgbImage, imageops, imageops::FilterType};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced while rasterizing PDF documents.
#[derive(Error, Debug)]
pub enum PdfError {
    /// The PDFium library could not be located or loaded.
    #[error("failed to initialize PDFium: {0}")]
    Init(String),

    /// The document could not be parsed.
    #[error("failed to load PDF: {0}")]
    Load(String),

    /// A single page failed to render. Pages are numbered from 1.
    #[error("failed to render page {page}: {message}")]
    Render {
        /// 1-based page number.
        page: usize,
        /// Underlying render failure.
        message: String,
    },

    /// The document contains no pages.
    #[error("PDF has no pages")]
    Empty,
}

/// Configuration for PDF rendering.
#[derive(Debug, Clone)]
pub struct PdfRenderSettings {
    /// Render scale relative to PDF point size (2.0 is roughly 144 DPI).
    pub scale: f32,
    /// Maximum dimension for rendered images; larger pages are downscaled.
    pub max_dimension: u32,
    /// Directory holding the PDFium shared library, checked before the
    /// standard search locations.
    pub library_path: Option<PathBuf>,
}

impl Default for PdfRenderSettings {
    fn default() -> Self {
        Self {
            scale: 2.0,
            max_dimension: 2000,
            library_path: None,
        }
    }
}

/// PDF rasterizer that converts document pages to RGB images.
pub struct PdfRasterizer {
    pdfium: Pdfium,
    config: PdfRenderSettings,
}

impl PdfRasterizer {
    /// Creates a new rasterizer, binding to the PDFium shared library.
    ///
    /// The configured `library_path` is probed first, then the working
    /// directory and common install locations, then the system library.
    pub fn new(config: PdfRenderSettings) -> Result<Self, PdfError> {
        let first_probe = match &config.library_path {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./")),
        };

        let pdfium = Pdfium::new(
            first_probe
                .or_else(|_| {
                    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                        "/usr/lib",
                    ))
                })
                .or_else(|_| {
                    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                        "/usr/local/lib",
                    ))
                })
                .or_else(|_| {
                    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                        "/opt/homebrew/lib",
                    ))
                })
                .or_else(|_| Pdfium::bind_to_system_library())
                .map_err(|e| PdfError::Init(format!("could not find PDFium library: {e}")))?,
        );

        Ok(Self { pdfium, config })
    }

    /// Loads a PDF from a file path and renders all pages to images.
    pub fn render_pdf_file(&self, path: &Path) -> Result<Vec<RgbImage>, PdfError> {
        let document = self
            .pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| PdfError::Load(e.to_string()))?;

        self.render_document(&document)
    }

    /// Renders every page of a document, in page order.
    fn render_document(&self, document: &PdfDocument) -> Result<Vec<RgbImage>, PdfError> {
        let page_count = document.pages().len();
        if page_count == 0 {
            return Err(PdfError::Empty);
        }

        let mut images = Vec::with_capacity(page_count as usize);
        for (index, page) in document.pages().iter().enumerate() {
            let image = self.render_page(&page).map_err(|e| PdfError::Render {
                page: index + 1,
                message: e.to_string(),
            })?;
            images.push(image);
        }

        Ok(images)
    }

    /// Renders a single page at the configured scale.
    fn render_page(&self, page: &PdfPage) -> Result<RgbImage, PdfiumError> {
        let width_px = (page.width().value * self.config.scale).round().max(1.0) as u32;
        let height_px = (page.height().value * self.config.scale).round().max(1.0) as u32;

        let render_config = PdfRenderConfig::new()
            .set_target_width(width_px as i32)
            .set_target_height(height_px as i32)
            .render_form_data(true)
            .render_annotations(true);

        let bitmap = page.render_with_config(&render_config)?;
        let rendered = bitmap.as_image().into_rgb8();

        Ok(cap_dimensions(rendered, self.config.max_dimension))
    }
}

/// Downscales an image so its longest side fits within `max_dimension`,
/// preserving aspect ratio. Images already within the cap pass through.
fn cap_dimensions(image: RgbImage, max_dimension: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let longest = width.max(height);
    if longest <= max_dimension {
        return image;
    }

    let ratio = max_dimension as f32 / longest as f32;
    let new_width = ((width as f32 * ratio).round() as u32).max(1);
    let new_height = ((height as f32 * ratio).round() as u32).max(1);
    imageops::resize(&image, new_width, new_height, FilterType::Lanczos3)
}
