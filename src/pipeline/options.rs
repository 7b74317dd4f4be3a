//! Pipeline configuration.

use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::assemble::{AssemblerOptions, DEFAULT_CROP_PADDING};
use crate::error::{Error, Result};
use crate::geometry::DEFAULT_MIN_OVERLAP;
use crate::provider::{RetryPolicy, TOKEN_SCHEDULE};
use crate::toc::TocOptions;

/// Options for a full pipeline run.
///
/// Every field has a default, so a JSON config file only needs the fields it
/// changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Worker threads for page and table work (0 = one per CPU)
    pub workers: usize,

    /// Columns assumed by the heuristic reading order
    pub num_columns: usize,

    /// Pages holding the table of contents
    pub toc_pages: PageSelection,

    /// Pages excluded from body assembly (covers, indexes)
    pub skip_pages: PageSelection,

    /// Body font size; larger isolated lines become titles
    pub prose_font_size: Option<f32>,

    /// Layout regions below this confidence are ignored (noise labels excepted)
    pub min_confidence: f32,

    /// Minimum overlap of an OCR line with a layout region
    pub min_overlap: f32,

    /// Per provider call timeout in milliseconds
    pub timeout_ms: Option<u64>,

    /// Retry policy for provider calls
    pub retry: RetryPolicy,

    /// Directory for table crops; no crops are written when unset
    pub crop_dir: Option<PathBuf>,

    /// Padding around table crops, in pixels
    pub crop_padding: u32,

    /// Drop "CONTENTS" headings on TOC pages
    pub toc_noise_filter: bool,

    /// With the noise filter, drop TOC lines at or below this font size
    pub toc_min_font_size: Option<f32>,

    /// Output-size schedule for table extraction
    pub table_schedule: Vec<u32>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            workers: 0,
            num_columns: 1,
            toc_pages: PageSelection::none(),
            skip_pages: PageSelection::none(),
            prose_font_size: None,
            min_confidence: 0.0,
            min_overlap: DEFAULT_MIN_OVERLAP,
            timeout_ms: None,
            retry: RetryPolicy::default(),
            crop_dir: None,
            crop_padding: DEFAULT_CROP_PADDING,
            toc_noise_filter: false,
            toc_min_font_size: None,
            table_schedule: TOKEN_SCHEDULE.to_vec(),
        }
    }
}

impl PipelineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON file.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_columns(mut self, num_columns: usize) -> Self {
        self.num_columns = num_columns;
        self
    }

    pub fn with_toc_pages(mut self, pages: PageSelection) -> Self {
        self.toc_pages = pages;
        self
    }

    pub fn with_skip_pages(mut self, pages: PageSelection) -> Self {
        self.skip_pages = pages;
        self
    }

    pub fn with_prose_font_size(mut self, size: f32) -> Self {
        self.prose_font_size = Some(size);
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_crop_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.crop_dir = Some(dir.into());
        self
    }

    /// Per-call timeout, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Check preconditions that no retry can fix.
    pub fn validate(&self) -> Result<()> {
        if self.num_columns < 1 {
            return Err(Error::InvalidConfig("num_columns must be >= 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.min_overlap) {
            return Err(Error::InvalidConfig(format!(
                "min_overlap must be within [0, 1], got {}",
                self.min_overlap
            )));
        }
        if self.table_schedule.is_empty() {
            return Err(Error::InvalidConfig("table_schedule must not be empty".to_string()));
        }
        if self.timeout_ms == Some(0) {
            return Err(Error::InvalidConfig("timeout_ms must be positive".to_string()));
        }
        self.retry.validate()
    }

    pub(crate) fn assembler_options(&self) -> AssemblerOptions {
        let options = AssemblerOptions::new().with_min_overlap(self.min_overlap);
        match self.prose_font_size {
            Some(size) => options.with_prose_font_size(size),
            None => options,
        }
    }

    pub(crate) fn toc_options(&self) -> TocOptions {
        let options = TocOptions::new().with_min_overlap(self.min_overlap);
        if self.toc_noise_filter {
            options.with_noise_filter(self.toc_min_font_size)
        } else {
            options
        }
    }
}

/// A set of 1-based page numbers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PageSelection {
    /// Every page
    #[default]
    All,
    /// An inclusive range of pages
    Range(RangeInclusive<u32>),
    /// Specific pages, sorted and without duplicates
    Pages(Vec<u32>),
}

impl PageSelection {
    /// The empty selection.
    pub fn none() -> Self {
        PageSelection::Pages(Vec::new())
    }

    /// Check if a page number is selected.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.contains(&page),
        }
    }

    /// Selected pages among `1..=last_page`, ascending.
    pub fn pages(&self, last_page: u32) -> Vec<u32> {
        (1..=last_page).filter(|&p| self.includes(p)).collect()
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PageSelection::All => false,
            PageSelection::Range(range) => range.is_empty(),
            PageSelection::Pages(pages) => pages.is_empty(),
        }
    }

    /// Parse a selection such as "all", "none", "1-10", or "1,3,5-7".
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }
        if s.is_empty() || s.eq_ignore_ascii_case("none") {
            return Ok(PageSelection::none());
        }

        let invalid = |part: &str| Error::InvalidConfig(format!("invalid page selection {:?}", part));
        let number = |part: &str| -> Result<u32> {
            match part.trim().parse::<u32>() {
                Ok(0) | Err(_) => Err(invalid(part)),
                Ok(p) => Ok(p),
            }
        };

        let range = |part: &str, start: &str, end: &str| -> Result<RangeInclusive<u32>> {
            let (start, end) = (number(start)?, number(end)?);
            if start > end {
                return Err(invalid(part));
            }
            Ok(start..=end)
        };

        // Simple range (e.g., "1-10")
        if let Some((start, end)) = s.split_once('-') {
            if !s.contains(',') {
                return Ok(PageSelection::Range(range(s, start, end)?));
            }
        }

        let mut pages = Vec::new();
        for part in s.split(',') {
            match part.split_once('-') {
                Some((start, end)) => pages.extend(range(part, start, end)?),
                None => pages.push(number(part)?),
            }
        }
        pages.sort_unstable();
        pages.dedup();
        Ok(PageSelection::Pages(pages))
    }
}

impl fmt::Display for PageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSelection::All => write!(f, "all"),
            PageSelection::Range(range) => write!(f, "{}-{}", range.start(), range.end()),
            PageSelection::Pages(pages) if pages.is_empty() => write!(f, "none"),
            PageSelection::Pages(pages) => {
                let parts: Vec<String> = pages.iter().map(u32::to_string).collect();
                write!(f, "{}", parts.join(","))
            }
        }
    }
}

impl TryFrom<String> for PageSelection {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        PageSelection::parse(&s)
    }
}

impl From<PageSelection> for String {
    fn from(selection: PageSelection) -> Self {
        selection.to_string()
    }
}

impl std::str::FromStr for PageSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PageSelection::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_selection_includes() {
        let all = PageSelection::All;
        assert!(all.includes(1));
        assert!(all.includes(100));

        let range = PageSelection::Range(5..=10);
        assert!(!range.includes(4));
        assert!(range.includes(5));
        assert!(range.includes(10));

        let pages = PageSelection::Pages(vec![1, 3, 5, 7]);
        assert!(pages.includes(3));
        assert!(!pages.includes(2));

        assert!(!PageSelection::none().includes(1));
    }

    #[test]
    fn test_page_selection_parse() {
        assert_eq!(PageSelection::parse("all").unwrap(), PageSelection::All);
        assert_eq!(PageSelection::parse("1-10").unwrap(), PageSelection::Range(1..=10));
        assert_eq!(
            PageSelection::parse("7,1,3,5-7,10").unwrap(),
            PageSelection::Pages(vec![1, 3, 5, 6, 7, 10])
        );
        assert!(PageSelection::parse("none").unwrap().is_empty());
        assert!(PageSelection::parse("x").is_err());
        assert!(PageSelection::parse("0").is_err());
        assert!(PageSelection::parse("9-2").is_err());
        assert!(PageSelection::parse("1,9-2").is_err());
        assert!(PageSelection::parse("3-3,7").unwrap().includes(3));
    }

    #[test]
    fn test_selected_pages_within_document() {
        assert_eq!(PageSelection::Range(3..=9).pages(5), vec![3, 4, 5]);
        assert_eq!(PageSelection::All.pages(3), vec![1, 2, 3]);
    }

    #[test]
    fn test_options_from_json() {
        let options: PipelineOptions = serde_json::from_str(
            r#"{"num_columns": 2, "toc_pages": "2-3", "skip_pages": "1", "retry": {"max_attempts": 5}}"#,
        )
        .unwrap();

        assert_eq!(options.num_columns, 2);
        assert_eq!(options.toc_pages, PageSelection::Range(2..=3));
        assert!(options.skip_pages.includes(1));
        assert_eq!(options.retry.max_attempts, 5);
        assert_eq!(options.table_schedule, vec![1024, 2048, 4096]);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_invalid_options() {
        assert!(PipelineOptions::new().with_columns(0).validate().is_err());
        let mut options = PipelineOptions::new();
        options.min_overlap = 1.5;
        assert!(options.validate().is_err());
        assert!(serde_json::from_str::<PipelineOptions>(r#"{"toc_pages": "abc"}"#).is_err());
    }
}
