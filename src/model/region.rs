//! Per-page input regions: OCR lines and detected layout regions.

use serde::{Deserialize, Serialize};

use crate::geometry::BBox;

/// Label attached to a detected layout region.
///
/// Labels outside the recognized set are kept verbatim in [`LayoutLabel::Other`]
/// and are treated as prose.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LayoutLabel {
    ParagraphTitle,
    FigureTitle,
    Footer,
    Number,
    Image,
    AsideText,
    Table,
    Content,
    Text,
    /// Any label the assembler does not know about
    Other(String),
}

impl LayoutLabel {
    /// The label as emitted by the layout detector.
    pub fn as_str(&self) -> &str {
        match self {
            LayoutLabel::ParagraphTitle => "paragraph_title",
            LayoutLabel::FigureTitle => "figure_title",
            LayoutLabel::Footer => "footer",
            LayoutLabel::Number => "number",
            LayoutLabel::Image => "image",
            LayoutLabel::AsideText => "aside_text",
            LayoutLabel::Table => "table",
            LayoutLabel::Content => "content",
            LayoutLabel::Text => "text",
            LayoutLabel::Other(s) => s,
        }
    }

    /// Regions whose text never belongs to the document body.
    pub fn is_noise(&self) -> bool {
        matches!(
            self,
            LayoutLabel::Footer | LayoutLabel::Number | LayoutLabel::Image | LayoutLabel::AsideText
        )
    }
}

impl From<&str> for LayoutLabel {
    fn from(s: &str) -> Self {
        match s {
            "paragraph_title" => LayoutLabel::ParagraphTitle,
            "figure_title" => LayoutLabel::FigureTitle,
            "footer" => LayoutLabel::Footer,
            "number" => LayoutLabel::Number,
            "image" => LayoutLabel::Image,
            "aside_text" => LayoutLabel::AsideText,
            "table" => LayoutLabel::Table,
            "content" => LayoutLabel::Content,
            "text" => LayoutLabel::Text,
            other => LayoutLabel::Other(other.to_string()),
        }
    }
}

impl From<String> for LayoutLabel {
    fn from(s: String) -> Self {
        LayoutLabel::from(s.as_str())
    }
}

impl From<LayoutLabel> for String {
    fn from(label: LayoutLabel) -> Self {
        match label {
            LayoutLabel::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

/// A line of OCR text with its box and font size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrRegion {
    /// Recognized text
    pub text: String,
    /// Box in page pixels
    pub bbox: BBox,
    /// Font size in points, when the OCR engine reports one
    #[serde(default, alias = "size", skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
}

impl OcrRegion {
    /// Create a new OCR region.
    pub fn new(text: impl Into<String>, bbox: impl Into<BBox>, font_size: Option<f32>) -> Self {
        Self {
            text: text.into(),
            bbox: bbox.into(),
            font_size,
        }
    }

    /// Font size bucketed to 0.1pt, so sizes can be compared and ranked exactly.
    pub fn font_key(&self) -> Option<i32> {
        self.font_size.map(font_key)
    }
}

/// Bucket a font size to 0.1pt precision.
pub fn font_key(size: f32) -> i32 {
    (size * 10.0).round() as i32
}

/// A region found by the layout detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutRegion {
    /// Detected region kind
    pub label: LayoutLabel,
    /// Detector confidence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Box in page pixels
    pub bbox: BBox,
}

impl LayoutRegion {
    /// Create a new layout region.
    pub fn new(label: impl Into<LayoutLabel>, bbox: impl Into<BBox>) -> Self {
        Self {
            label: label.into(),
            confidence: None,
            bbox: bbox.into(),
        }
    }

    /// Set the detector confidence.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Drop low-confidence layout regions.
///
/// Noise regions are kept whatever their score, so that they still suppress
/// the OCR lines they cover. Regions without a confidence are kept.
pub fn filter_by_confidence(regions: Vec<LayoutRegion>, min_confidence: f32) -> Vec<LayoutRegion> {
    regions
        .into_iter()
        .filter(|r| {
            r.label.is_noise() || r.confidence.map_or(true, |c| c >= min_confidence)
        })
        .collect()
}
