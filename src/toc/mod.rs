//! Table-of-contents extraction.
//!
//! TOC pages are parsed into flat [`TocEntry`] values whose level comes from
//! font size, the entries are nested into a [`TocForest`], and page ranges
//! are resolved against the document's last page.

mod parse;
mod tree;

pub use parse::{parse_toc_lines, parse_toc_pages, TocOptions};
pub use tree::TocForest;

use crate::error::Result;
use crate::model::{PageInput, TocEntry};

/// Parse TOC pages and build a forest with resolved page ranges.
pub fn extract_toc(pages: &[PageInput], last_page: u32, options: &TocOptions) -> Result<TocForest> {
    let entries = parse_toc_pages(pages, options)?;
    let mut forest = TocForest::build_tree(&entries);
    forest.compute_page_ranges(last_page);

    log::info!(
        "Extracted TOC: {} entries, {} top-level",
        forest.len(),
        forest.root_count()
    );
    Ok(forest)
}

/// Build a forest from entries and resolve its page ranges.
pub fn build_toc(entries: &[TocEntry], last_page: u32) -> TocForest {
    let mut forest = TocForest::build_tree(entries);
    forest.compute_page_ranges(last_page);
    forest
}
