//! Text assembly for OCR results.
//!
//! Recognized text regions are postprocessed and joined into page text, and
//! page texts are joined into document text with per-page headers.

use crate::pipeline::result::TextRegion;

/// Collapses runs of whitespace into single spaces and trims the ends.
///
/// Splits on Unicode whitespace and rejoins with single spaces, so tabs,
/// newlines, and non-breaking spaces inside a recognized line all normalize
/// to one space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Assembles the text of one page from its recognized regions.
///
/// Regions are taken in detection order. Each recognized text is whitespace
/// collapsed; lines that are empty afterwards are dropped. Survivors are
/// joined with `"\n"`.
pub fn assemble_page_text(regions: &[TextRegion]) -> String {
    regions
        .iter()
        .filter_map(|region| region.text.as_deref())
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assembles document text from per-page texts.
///
/// Each non-empty page is labeled `--- Page N ---` (N is the 1-based page
/// number, kept even when earlier pages are empty), followed by a newline
/// and the page text. Labeled pages are joined with a blank line. A document
/// whose pages are all empty yields an empty string.
pub fn assemble_document_text(page_texts: &[String]) -> String {
    page_texts
        .iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(index, text)| format!("--- Page {} ---\n{}", index + 1, text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::BoundingBox;
    use std::sync::Arc;

    fn region(text: Option<&str>) -> TextRegion {
        TextRegion::with_recognition(
            BoundingBox::from_coords(0.0, 0.0, 10.0, 10.0),
            text.map(Arc::from),
            text.map(|_| 0.9),
        )
    }

    #[test]
    fn test_collapse_whitespace_normalizes_runs_and_trims() {
        assert_eq!(collapse_whitespace("  xin   chào \t thế\ngiới  "), "xin chào thế giới");
        assert_eq!(collapse_whitespace("a\u{00A0}b"), "a b");
        assert_eq!(collapse_whitespace(""), "");
        assert_eq!(collapse_whitespace(" \t\n "), "");
    }

    #[test]
    fn test_assemble_page_text_keeps_detection_order() {
        let regions = vec![
            region(Some("dòng  một")),
            region(Some("dòng hai")),
            region(Some("dòng ba")),
        ];
        assert_eq!(
            assemble_page_text(&regions),
            "dòng một\ndòng hai\ndòng ba"
        );
    }

    #[test]
    fn test_assemble_page_text_drops_empty_and_unrecognized_lines() {
        let regions = vec![
            region(Some("một")),
            region(None),
            region(Some("   \t ")),
            region(Some("hai")),
        ];
        assert_eq!(assemble_page_text(&regions), "một\nhai");
    }

    #[test]
    fn test_assemble_page_text_empty_input() {
        assert_eq!(assemble_page_text(&[]), "");
    }

    #[test]
    fn test_assemble_document_text_labels_pages() {
        let pages = vec!["trang một".to_string(), "trang hai".to_string()];
        assert_eq!(
            assemble_document_text(&pages),
            "--- Page 1 ---\ntrang một\n\n--- Page 2 ---\ntrang hai"
        );
    }

    #[test]
    fn test_assemble_document_text_skips_empty_pages_but_keeps_numbering() {
        let pages = vec![String::new(), "nội dung".to_string(), String::new()];
        assert_eq!(assemble_document_text(&pages), "--- Page 2 ---\nnội dung");
    }

    #[test]
    fn test_assemble_document_text_all_empty_yields_empty_string() {
        let pages = vec![String::new(), "  ".to_string()];
        assert_eq!(assemble_document_text(&pages), "");
    }

    #[test]
    fn test_single_page_single_line_document() {
        let pages = vec!["một dòng".to_string()];
        assert_eq!(assemble_document_text(&pages), "--- Page 1 ---\nmột dòng");
    }
}
