//! External collaborators consumed by the pipeline.
//!
//! Rasterization, OCR, layout detection, and table-content inference live
//! behind these narrow traits. [`FixtureDir`] is the deterministic
//! implementation that replays precomputed results from disk.

mod fixture;
mod retry;
mod table;

pub use fixture::FixtureDir;
pub use retry::{CallGate, CancellationToken, RetryPolicy};
pub use table::{build_prompt, extract_table, TableRequest, TOKEN_SCHEDULE};

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::model::{LayoutRegion, OcrRegion};

/// The document's pages and their rendered images.
pub trait PageSource: Send + Sync {
    /// Number of pages; pages are numbered from 1.
    fn page_count(&self) -> Result<u32>;

    /// Rendered image of a page, if one exists.
    fn page_image(&self, page: u32) -> Result<Option<PathBuf>>;
}

/// Text lines with boxes and font sizes.
pub trait OcrProvider: Send + Sync {
    fn ocr_page(&self, page: u32) -> Result<Vec<OcrRegion>>;
}

/// Labeled layout regions.
pub trait LayoutProvider: Send + Sync {
    fn detect_page(&self, page: u32, image: Option<&Path>) -> Result<Vec<LayoutRegion>>;
}

/// Structured content of a table image.
///
/// Implementations return the raw model output; parsing and validation are
/// done by [`extract_table`]. `max_tokens` bounds the output size.
pub trait TableExtractor: Send + Sync {
    fn name(&self) -> &str;

    fn extract(&self, image: &Path, prompt: &str, max_tokens: u32) -> Result<String>;
}
