//! End-to-end document structure pipeline.
//!
//! Stages:
//! 1. TOC pages are parsed into a forest with resolved page ranges.
//! 2. Body pages are loaded (OCR, layout, reading order) and assembled into
//!    blocks on a bounded worker pool, keyed by page number.
//! 3. Once every page is done, blocks are aligned to the TOC, grouped into
//!    sections, and table contents are extracted.
//!
//! A page or table whose provider calls fail for good is recorded in
//! [`DocumentStructure::failures`]; sibling work carries on.

mod options;

pub use options::{PageSelection, PipelineOptions};

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;

use crate::align::{build_sections, AlignOptions, SectionAligner};
use crate::assemble::{BlockAssembler, ImageCropper, TableCropper};
use crate::error::{Error, Result};
use crate::geometry::BBox;
use crate::model::{
    filter_by_confidence, Block, DocumentStructure, PageInput, UnitFailure, WorkUnit,
};
use crate::order::{validate_permutation, ColumnHeuristic, ReadingOrderProvider};
use crate::provider::{
    extract_table, CallGate, CancellationToken, FixtureDir, LayoutProvider, OcrProvider,
    PageSource, TableExtractor, TableRequest,
};
use crate::toc::{parse_toc_pages, TocForest};

/// Called with the page number after each body page finishes.
pub type ProgressFn = Arc<dyn Fn(u32) + Send + Sync>;

/// Reconstructs document structure from provider output.
pub struct Pipeline {
    options: PipelineOptions,
    pages: Arc<dyn PageSource>,
    ocr: Arc<dyn OcrProvider>,
    layout: Arc<dyn LayoutProvider>,
    order: Arc<dyn ReadingOrderProvider>,
    tables: Option<Arc<dyn TableExtractor>>,
    cropper: Option<Arc<dyn TableCropper>>,
    gate: CallGate,
    cancel: CancellationToken,
    progress: Option<ProgressFn>,
}

impl Pipeline {
    /// Create a pipeline using the column heuristic for reading order.
    ///
    /// Fails immediately on invalid options.
    pub fn new(
        options: PipelineOptions,
        pages: Arc<dyn PageSource>,
        ocr: Arc<dyn OcrProvider>,
        layout: Arc<dyn LayoutProvider>,
    ) -> Result<Self> {
        options.validate()?;
        let order = Arc::new(ColumnHeuristic::new(options.num_columns)?);
        let cropper = options.crop_dir.as_ref().map(|dir| {
            Arc::new(ImageCropper::new(dir).with_padding(options.crop_padding))
                as Arc<dyn TableCropper>
        });
        let gate = match options.workers {
            0 => CallGate::default(),
            workers => CallGate::new(workers),
        };

        Ok(Self {
            options,
            pages,
            ocr,
            layout,
            order,
            tables: None,
            cropper,
            gate,
            cancel: CancellationToken::new(),
            progress: None,
        })
    }

    /// Create a pipeline replaying a fixture directory.
    pub fn from_fixture(fixture: FixtureDir, options: PipelineOptions) -> Result<Self> {
        let fixture = Arc::new(fixture);
        Self::new(options, fixture.clone(), fixture.clone(), fixture)
    }

    /// Use another reading-order provider.
    pub fn with_reading_order(mut self, order: Arc<dyn ReadingOrderProvider>) -> Self {
        self.order = order;
        self
    }

    /// Extract table contents with `extractor`.
    pub fn with_table_extractor(mut self, extractor: Arc<dyn TableExtractor>) -> Self {
        self.tables = Some(extractor);
        self
    }

    /// Crop tables with `cropper` instead of the configured crop directory.
    pub fn with_cropper(mut self, cropper: Arc<dyn TableCropper>) -> Self {
        self.cropper = Some(cropper);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Token that cancels this pipeline's outstanding work.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run every stage.
    pub fn run(&self) -> Result<DocumentStructure> {
        let last_page = self.pages.page_count()?;
        let mut doc = DocumentStructure::new();
        log::info!("Processing document with {} pages", last_page);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.workers)
            .thread_name(|i| format!("docstruct-{}", i))
            .build()
            .map_err(|e| Error::Other(format!("failed to build worker pool: {}", e)))?;

        let toc = self.build_toc(last_page, &mut doc.failures)?;
        doc.toc = toc.to_nodes();

        let body_pages = self.body_pages(last_page);
        let results: Vec<(u32, Result<Vec<Block>>)> = pool.install(|| {
            body_pages
                .par_iter()
                .map(|&page| {
                    let result = self.process_page(page);
                    if let Some(progress) = &self.progress {
                        progress(page);
                    }
                    (page, result)
                })
                .collect()
        });

        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        for (page, result) in results {
            match result {
                Ok(blocks) => {
                    doc.pages.insert(page, blocks);
                }
                Err(e) => {
                    log::warn!("Page {} failed: {}", page, e);
                    doc.failures.push(UnitFailure::new(WorkUnit::Page { page }, e));
                }
            }
        }

        // Barrier: everything below needs every page.
        let blocks: Vec<Block> = doc.pages.values().flatten().cloned().collect();
        let align = AlignOptions::new().with_skip_pages(self.options.skip_pages.pages(last_page));
        let aligned = SectionAligner::new(&toc, align).align(blocks);
        doc.sections = build_sections(&aligned.text_blocks);
        doc.text_blocks = aligned.text_blocks;
        doc.table_blocks = aligned.table_blocks;

        if let Some(extractor) = &self.tables {
            self.extract_tables(&pool, extractor, &mut doc)?;
        }

        log::info!(
            "Done: {} blocks, {} sections, {} TOC entries, {} failures",
            doc.block_count(),
            doc.sections.len(),
            doc.toc_entry_count(),
            doc.failures.len()
        );
        Ok(doc)
    }

    /// Body pages: everything except TOC and skipped pages.
    fn body_pages(&self, last_page: u32) -> Vec<u32> {
        (1..=last_page)
            .filter(|&p| !self.options.toc_pages.includes(p) && !self.options.skip_pages.includes(p))
            .collect()
    }

    fn build_toc(&self, last_page: u32, failures: &mut Vec<UnitFailure>) -> Result<TocForest> {
        let toc_pages = self.options.toc_pages.pages(last_page);
        if toc_pages.is_empty() {
            return Ok(TocForest::default());
        }

        let mut inputs = Vec::with_capacity(toc_pages.len());
        for page in toc_pages {
            match self.load_page(page) {
                Ok(input) => inputs.push(input),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    log::warn!("TOC page {} failed: {}", page, e);
                    failures.push(UnitFailure::new(WorkUnit::TocPage { page }, e));
                }
            }
        }

        let entries = parse_toc_pages(&inputs, &self.options.toc_options())?;
        let mut forest = TocForest::build_tree(&entries);
        forest.compute_page_ranges(last_page);
        log::info!("TOC: {} entries from {} pages", forest.len(), inputs.len());
        Ok(forest)
    }

    /// Load and assemble one body page.
    fn process_page(&self, page: u32) -> Result<Vec<Block>> {
        let input = self.load_page(page)?;
        let mut assembler = BlockAssembler::new(self.options.assembler_options());
        if let Some(cropper) = &self.cropper {
            assembler = assembler.with_cropper(Arc::clone(cropper));
        }
        assembler.assemble_page(&input)
    }

    /// Gather one page's OCR, layout, and reading order from the providers.
    pub fn load_page(&self, page: u32) -> Result<PageInput> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let image = self.pages.page_image(page)?;

        let ocr = {
            let provider = Arc::clone(&self.ocr);
            self.call("ocr", move || provider.ocr_page(page))?
        };

        let layout = {
            let provider = Arc::clone(&self.layout);
            let image = image.clone();
            self.call("layout", move || provider.detect_page(page, image.as_deref()))?
        };
        let layout = filter_by_confidence(layout, self.options.min_confidence);

        let reading_order = if ocr.is_empty() {
            Vec::new()
        } else {
            let provider = Arc::clone(&self.order);
            let boxes: Vec<BBox> = ocr.iter().map(|r| r.bbox).collect();
            let order = self.call("reading-order", move || provider.order(&boxes))?;
            validate_permutation(&order, ocr.len())?;
            order
        };

        let mut input = PageInput::new(page)
            .with_ocr(ocr)
            .with_layout(layout)
            .with_reading_order(reading_order);
        input.image = image;
        Ok(input)
    }

    /// One provider call under the timeout and retry policy.
    fn call<T, F>(&self, provider: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let timeout = self.options.timeout();
        self.options.retry.run(provider, &self.cancel, |_| {
            let f = Arc::clone(&f);
            self.gate.call(provider, timeout, move || f())
        })
    }

    fn extract_tables(
        &self,
        pool: &rayon::ThreadPool,
        extractor: &Arc<dyn TableExtractor>,
        doc: &mut DocumentStructure,
    ) -> Result<()> {
        let request = TableRequest::new()
            .with_schedule(self.options.table_schedule.clone())
            .with_retry(self.options.retry.clone())
            .with_timeout(self.options.timeout())
            .with_gate(self.gate.clone());

        let candidates: Vec<&Block> = doc
            .table_blocks
            .iter()
            .filter(|b| b.image_crop.is_some())
            .collect();
        log::info!(
            "Extracting {} of {} tables with {}",
            candidates.len(),
            doc.table_blocks.len(),
            extractor.name()
        );

        let results: Vec<(String, Result<_>)> = pool.install(|| {
            candidates
                .par_iter()
                .map(|block| {
                    let result = extract_table(Arc::clone(extractor), block, &request, &self.cancel);
                    (block.block_id.clone(), result)
                })
                .collect()
        });

        for (block_id, result) in results {
            match result {
                Ok(table) => doc.tables.push(table),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    log::warn!("Table {} failed: {}", block_id, e);
                    doc.failures.push(UnitFailure::new(WorkUnit::Table { block_id }, e));
                }
            }
        }
        Ok(())
    }
}

#[cfg(feature = "async")]
impl Pipeline {
    /// Run the pipeline on tokio's blocking pool.
    pub async fn run_async(self: Arc<Self>) -> Result<DocumentStructure> {
        tokio::task::spawn_blocking(move || self.run())
            .await
            .map_err(|e| Error::Other(format!("pipeline task failed: {}", e)))?
    }
}

/// Group blocks by page, each page in `order_id` order.
pub fn blocks_by_page(blocks: Vec<Block>) -> BTreeMap<u32, Vec<Block>> {
    let mut pages: BTreeMap<u32, Vec<Block>> = BTreeMap::new();
    for block in blocks {
        pages.entry(block.page).or_default().push(block);
    }
    for blocks in pages.values_mut() {
        blocks.sort_by_key(|b| b.order_id);
    }
    pages
}
