//! # docstruct
//!
//! Document structure reconstruction from per-page OCR and layout signals.
//!
//! Given OCR lines (text, box, font size), labeled layout regions, and a
//! reading order for each page, this library assembles ordered text and
//! table blocks, extracts a table of contents with page ranges, and aligns
//! the blocks to the TOC to produce sections.
//!
//! ## Quick Start
//!
//! ```no_run
//! use docstruct::{Docstruct, JsonFormat, PageSelection};
//!
//! fn main() -> docstruct::Result<()> {
//!     let result = Docstruct::new()
//!         .with_columns(2)
//!         .with_toc_pages(PageSelection::parse("2-3")?)
//!         .process_dir("fixtures/book")?;
//!
//!     result.write_to("out", JsonFormat::Pretty)?;
//!     println!("{} sections", result.document().sections.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Stages
//!
//! - **Geometry**: asymmetric box overlap used to match OCR lines to regions
//! - **Reading order**: column heuristic or a learned scoring model
//! - **Assembly**: per-page fold from ordered lines to blocks
//! - **TOC**: dot-leader line parsing, font-size levels, page ranges
//! - **Alignment**: TOC paths for blocks, merging, sections
//! - **Pipeline**: bounded parallelism, retries, timeouts, per-unit failures

pub mod align;
pub mod assemble;
pub mod error;
pub mod geometry;
pub mod model;
pub mod normalize;
pub mod order;
pub mod pipeline;
pub mod provider;
pub mod render;
pub mod toc;

// Re-export commonly used types
pub use align::{build_sections, AlignOptions, AlignedBlocks, SectionAligner};
pub use assemble::{AssemblerOptions, BlockAssembler, ImageCropper, TableCropper};
pub use error::{Error, Result};
pub use geometry::{intersects, BBox, DEFAULT_MIN_OVERLAP};
pub use model::{
    Block, BlockKind, DocumentStructure, ExtractedTable, LayoutLabel, LayoutRegion, OcrRegion,
    PageInput, Section, TableContent, TocEntry, TocNode, TocPath, UnitFailure, WorkUnit,
};
pub use normalize::{normalize_text, normalize_title, NormalizeOptions, TextNormalizer};
pub use order::{heuristic_reading_order, ColumnHeuristic, ReadingOrderProvider};
pub use pipeline::{PageSelection, Pipeline, PipelineOptions};
pub use provider::{CancellationToken, FixtureDir, RetryPolicy, TableExtractor};
pub use render::JsonFormat;
pub use toc::{build_toc, extract_toc, TocForest, TocOptions};

use std::path::Path;
use std::sync::Arc;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Assemble one page with default options.
///
/// # Example
///
/// ```
/// use docstruct::{assemble_page, LayoutRegion, OcrRegion, PageInput};
///
/// let page = PageInput::new(1)
///     .with_ocr(vec![
///         OcrRegion::new("Introduction", [0.0, 0.0, 100.0, 20.0], Some(14.0)),
///         OcrRegion::new("Body text here.", [0.0, 25.0, 100.0, 40.0], Some(10.0)),
///     ])
///     .with_layout(vec![LayoutRegion::new("paragraph_title", [0.0, 0.0, 100.0, 20.0])])
///     .with_reading_order(vec![0, 1]);
///
/// let blocks = assemble_page(&page).unwrap();
/// assert_eq!(blocks.len(), 1);
/// assert_eq!(blocks[0].title.as_deref(), Some("Introduction"));
/// ```
pub fn assemble_page(page: &PageInput) -> Result<Vec<Block>> {
    BlockAssembler::default().assemble_page(page)
}

/// Align blocks from every page to a TOC and group them into sections.
pub fn align_blocks(blocks: Vec<Block>, toc: &[TocNode]) -> (AlignedBlocks, Vec<Section>) {
    let forest = TocForest::from(toc);
    let aligned = SectionAligner::new(&forest, AlignOptions::default()).align(blocks);
    let sections = build_sections(&aligned.text_blocks);
    (aligned, sections)
}

/// Builder for a full pipeline run over a fixture directory.
///
/// # Example
///
/// ```no_run
/// use docstruct::Docstruct;
///
/// let doc = Docstruct::new()
///     .with_columns(2)
///     .with_prose_font_size(10.0)
///     .process_dir("fixtures/book")?
///     .into_document();
/// # Ok::<(), docstruct::Error>(())
/// ```
pub struct Docstruct {
    options: PipelineOptions,
    tables: Option<Arc<dyn TableExtractor>>,
    cancel: CancellationToken,
}

impl Docstruct {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self {
            options: PipelineOptions::default(),
            tables: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Replace all options, e.g. with ones loaded from a config file.
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the number of text columns.
    pub fn with_columns(mut self, num_columns: usize) -> Self {
        self.options = self.options.with_columns(num_columns);
        self
    }

    /// Set the TOC pages.
    pub fn with_toc_pages(mut self, pages: PageSelection) -> Self {
        self.options = self.options.with_toc_pages(pages);
        self
    }

    /// Set pages excluded from the body.
    pub fn with_skip_pages(mut self, pages: PageSelection) -> Self {
        self.options = self.options.with_skip_pages(pages);
        self
    }

    /// Set the body font size used to infer titles.
    pub fn with_prose_font_size(mut self, size: f32) -> Self {
        self.options = self.options.with_prose_font_size(size);
        self
    }

    /// Set the number of worker threads.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.options = self.options.with_workers(workers);
        self
    }

    /// Write table crops into `dir`.
    pub fn with_crop_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.options = self.options.with_crop_dir(dir);
        self
    }

    /// Extract table contents with `extractor`.
    pub fn with_table_extractor(mut self, extractor: Arc<dyn TableExtractor>) -> Self {
        self.tables = Some(extractor);
        self
    }

    /// Use a cancellation token shared with the caller.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Options the pipeline will run with.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run the pipeline over a fixture directory.
    pub fn process_dir<P: AsRef<Path>>(self, path: P) -> Result<DocstructResult> {
        let fixture = FixtureDir::open(path.as_ref())?;
        let mut pipeline =
            Pipeline::from_fixture(fixture, self.options)?.with_cancellation(self.cancel);
        if let Some(extractor) = self.tables {
            pipeline = pipeline.with_table_extractor(extractor);
        }

        Ok(DocstructResult {
            document: pipeline.run()?,
        })
    }
}

impl Default for Docstruct {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a pipeline run.
pub struct DocstructResult {
    document: DocumentStructure,
}

impl DocstructResult {
    /// Write all artifacts into `dir`.
    pub fn write_to<P: AsRef<Path>>(&self, dir: P, format: JsonFormat) -> Result<render::Manifest> {
        render::write_artifacts(dir.as_ref(), &self.document, format)
    }

    /// The whole structure as one JSON document.
    pub fn to_json(&self, format: JsonFormat) -> Result<String> {
        render::to_json(&self.document, format)
    }

    /// Get the document structure.
    pub fn document(&self) -> &DocumentStructure {
        &self.document
    }

    pub fn into_document(self) -> DocumentStructure {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let builder = Docstruct::new()
            .with_columns(2)
            .with_workers(4)
            .with_prose_font_size(10.5)
            .with_toc_pages(PageSelection::Range(2..=3));

        assert_eq!(builder.options().num_columns, 2);
        assert_eq!(builder.options().workers, 4);
        assert_eq!(builder.options().prose_font_size, Some(10.5));
        assert!(builder.options().toc_pages.includes(3));
    }

    #[test]
    fn test_builder_rejects_bad_columns() {
        let dir = tempfile::tempdir().unwrap();
        let result = Docstruct::new().with_columns(0).process_dir(dir.path());
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_process_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let result = Docstruct::new().process_dir(dir.path()).unwrap();
        assert_eq!(result.document().block_count(), 0);
        assert!(result.to_json(JsonFormat::Compact).unwrap().contains("\"sections\":[]"));
    }

    #[test]
    fn test_align_blocks_with_nodes() {
        let toc = vec![TocNode::new("Intro", 0, Some(1))];
        let blocks = vec![Block::text(1, 0, Some("Intro".into()), "hello")];
        let (aligned, sections) = align_blocks(blocks, &toc);

        assert_eq!(aligned.text_blocks[0].toc_path, Some(vec!["Intro".to_string()]));
        assert_eq!(sections.len(), 1);
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
