//! Page-level input bundle.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{LayoutRegion, OcrRegion};

/// Everything the assembler needs to know about one page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageInput {
    /// Page number (1-indexed)
    pub page: u32,

    /// OCR lines, in detector order
    #[serde(default)]
    pub ocr: Vec<OcrRegion>,

    /// Layout regions, in matching priority order
    #[serde(default)]
    pub layout: Vec<LayoutRegion>,

    /// Indices into `ocr` in reading sequence
    #[serde(default)]
    pub reading_order: Vec<usize>,

    /// Rendered page image, used for table crops
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
}

impl PageInput {
    /// Create an empty page.
    pub fn new(page: u32) -> Self {
        Self {
            page,
            ..Default::default()
        }
    }

    /// Set the OCR lines.
    pub fn with_ocr(mut self, ocr: Vec<OcrRegion>) -> Self {
        self.ocr = ocr;
        self
    }

    /// Set the layout regions.
    pub fn with_layout(mut self, layout: Vec<LayoutRegion>) -> Self {
        self.layout = layout;
        self
    }

    /// Set the reading order.
    pub fn with_reading_order(mut self, order: Vec<usize>) -> Self {
        self.reading_order = order;
        self
    }

    /// Set the page image path.
    pub fn with_image(mut self, image: impl Into<PathBuf>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Check if the page carries no regions at all.
    pub fn is_empty(&self) -> bool {
        self.ocr.is_empty() && self.layout.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_input_from_fixture_json() {
        let json = r#"{
            "page": 4,
            "ocr": [{"text": "Hello", "bbox": [0, 0, 10, 10], "font_size": 10}],
            "layout": [{"label": "content", "bbox": [0, 0, 50, 50]}],
            "reading_order": [0]
        }"#;
        let page: PageInput = serde_json::from_str(json).unwrap();
        assert_eq!(page.page, 4);
        assert_eq!(page.ocr.len(), 1);
        assert!(page.image.is_none());
        assert!(!page.is_empty());
    }

    #[test]
    fn test_page_input_defaults() {
        let page = PageInput::new(1);
        assert!(page.is_empty());
        assert!(page.reading_order.is_empty());
    }
}
