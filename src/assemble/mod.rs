//! Per-page block assembly.
//!
//! OCR lines are visited in reading order and classified against the page's
//! layout regions. The classification drives a small state machine whose
//! state (current title, pending prose, tables already emitted) is folded
//! over the line sequence; every step yields the next state and the blocks
//! it closed.

mod crop;

pub use crop::{ImageCropper, TableCropper, DEFAULT_CROP_PADDING};

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::geometry::{first_match, intersects, BBox, DEFAULT_MIN_OVERLAP};
use crate::model::{block_id, Block, BlockKind, LayoutLabel, OcrRegion, PageInput};
use crate::order::validate_permutation;

/// Options for [`BlockAssembler`].
#[derive(Debug, Clone)]
pub struct AssemblerOptions {
    /// Body font size of the page, enabling inferred titles for larger lines
    pub prose_font_size: Option<f32>,

    /// Minimum overlap of an OCR line with a layout region, as a share of the line
    pub min_overlap: f32,
}

impl AssemblerOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the prose font size used to infer unlabeled titles.
    pub fn with_prose_font_size(mut self, size: f32) -> Self {
        self.prose_font_size = Some(size);
        self
    }

    /// Set the minimum overlap ratio.
    pub fn with_min_overlap(mut self, min_overlap: f32) -> Self {
        self.min_overlap = min_overlap;
        self
    }
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            prose_font_size: None,
            min_overlap: DEFAULT_MIN_OVERLAP,
        }
    }
}

/// What a single OCR line contributes to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Noise,
    Title,
    /// Content of the table layout region at this index
    Table(usize),
    Prose,
}

/// Accumulator folded over a page's lines.
#[derive(Debug, Clone, Default)]
struct PageState {
    title: Option<String>,
    prose: Vec<String>,
    emitted_tables: BTreeSet<usize>,
    next_order: u32,
}

impl PageState {
    /// Close pending prose as a text block under the current title.
    fn flush(mut self, page: u32) -> (Self, Option<Block>) {
        if self.prose.is_empty() {
            return (self, None);
        }
        let text = self.prose.join(" ");
        self.prose.clear();
        let block = Block::text(page, self.next_order, self.title.clone(), text);
        self.next_order += 1;
        (self, Some(block))
    }

    fn apply(self, step: Step, text: &str, page: &PageContext<'_>) -> (Self, Vec<Block>) {
        match step {
            Step::Noise => (self, Vec::new()),
            Step::Title => {
                let (mut state, flushed) = self.flush(page.number);
                state.title = Some(text.to_string());
                (state, flushed.into_iter().collect())
            }
            Step::Table(index) if self.emitted_tables.contains(&index) => (self, Vec::new()),
            Step::Table(index) => {
                let (mut state, flushed) = self.flush(page.number);
                let id = block_id(BlockKind::Table, page.number, state.next_order);
                let crop = page.crop(index, &id);
                let table = Block::table(page.number, state.next_order, state.title.clone(), crop);
                state.next_order += 1;
                state.emitted_tables.insert(index);

                let mut blocks: Vec<Block> = flushed.into_iter().collect();
                blocks.push(table);
                (state, blocks)
            }
            Step::Prose => {
                let mut state = self;
                state.prose.push(text.to_string());
                (state, Vec::new())
            }
        }
    }
}

/// Read-only inputs shared by every step of one page.
struct PageContext<'a> {
    number: u32,
    input: &'a PageInput,
    cropper: Option<&'a dyn TableCropper>,
}

impl PageContext<'_> {
    fn crop(&self, layout_index: usize, block_id: &str) -> Option<PathBuf> {
        let cropper = self.cropper?;
        let image = self.input.image.as_deref()?;
        let bbox = &self.input.layout[layout_index].bbox;

        match cropper.crop(image, bbox, block_id) {
            Ok(path) => Some(path),
            Err(e) => {
                log::warn!(
                    "Failed to crop table {} on page {}: {}",
                    block_id,
                    self.number,
                    e
                );
                None
            }
        }
    }
}

/// Turns one page's regions into an ordered block list.
#[derive(Clone, Default)]
pub struct BlockAssembler {
    options: AssemblerOptions,
    cropper: Option<Arc<dyn TableCropper>>,
}

impl BlockAssembler {
    /// Create an assembler without table cropping.
    pub fn new(options: AssemblerOptions) -> Self {
        Self {
            options,
            cropper: None,
        }
    }

    /// Crop table regions out of the page image with `cropper`.
    pub fn with_cropper(mut self, cropper: Arc<dyn TableCropper>) -> Self {
        self.cropper = Some(cropper);
        self
    }

    pub fn options(&self) -> &AssemblerOptions {
        &self.options
    }

    /// Assemble the blocks of one page.
    ///
    /// An empty `reading_order` means the OCR lines are already in reading
    /// sequence. Otherwise it must be a permutation of the OCR indices.
    pub fn assemble_page(&self, input: &PageInput) -> Result<Vec<Block>> {
        if input.ocr.is_empty() {
            return Ok(Vec::new());
        }

        let sequence: Vec<usize> = if input.reading_order.is_empty() {
            (0..input.ocr.len()).collect()
        } else {
            validate_permutation(&input.reading_order, input.ocr.len())?;
            input.reading_order.clone()
        };

        // Blank lines carry nothing; neighbours for the font heuristic skip them.
        let lines: Vec<(&OcrRegion, &str)> = sequence
            .iter()
            .map(|&i| &input.ocr[i])
            .map(|region| (region, region.text.trim()))
            .filter(|(_, text)| !text.is_empty())
            .collect();

        let page = PageContext {
            number: input.page,
            input,
            cropper: self.cropper.as_deref(),
        };

        let mut state = PageState::default();
        let mut blocks = Vec::new();
        for (position, (region, text)) in lines.iter().enumerate() {
            let step = self.classify(input, &lines, position);
            let (next, emitted) = state.apply(step, text, &page);
            log::trace!("page {} line {:?}: {:?}", input.page, region.bbox, step);
            state = next;
            blocks.extend(emitted);
        }

        let (_, last) = state.flush(input.page);
        blocks.extend(last);

        log::debug!(
            "Assembled page {}: {} lines into {} blocks",
            input.page,
            lines.len(),
            blocks.len()
        );
        Ok(blocks)
    }

    fn classify(&self, input: &PageInput, lines: &[(&OcrRegion, &str)], position: usize) -> Step {
        let region = lines[position].0;
        let min_overlap = self.options.min_overlap;

        let label = first_match(
            &region.bbox,
            input.layout.iter().map(|l| &l.bbox),
            min_overlap,
        )
        .map(|i| &input.layout[i].label);

        match label {
            Some(
                LayoutLabel::Footer
                | LayoutLabel::Number
                | LayoutLabel::Image
                | LayoutLabel::AsideText,
            ) => return Step::Noise,
            Some(LayoutLabel::ParagraphTitle | LayoutLabel::FigureTitle) => return Step::Title,
            Some(
                LayoutLabel::Table
                | LayoutLabel::Content
                | LayoutLabel::Text
                | LayoutLabel::Other(_),
            )
            | None => {}
        }

        if let Some(table) = table_region(&region.bbox, input, min_overlap) {
            return Step::Table(table);
        }

        if self.is_inferred_title(lines, position) {
            Step::Title
        } else {
            Step::Prose
        }
    }

    /// A line set larger than body text whose size differs from both neighbours.
    fn is_inferred_title(&self, lines: &[(&OcrRegion, &str)], position: usize) -> bool {
        let (Some(prose), Some(size)) = (
            self.options.prose_font_size,
            lines[position].0.font_key(),
        ) else {
            return false;
        };

        if size <= crate::model::font_key(prose) {
            return false;
        }

        let differs = |neighbour: Option<&(&OcrRegion, &str)>| {
            neighbour.and_then(|(r, _)| r.font_key()) != Some(size)
        };
        let prev = position.checked_sub(1).and_then(|p| lines.get(p));
        let next = lines.get(position + 1);

        differs(prev) && differs(next)
    }
}

/// Index of the first table region the line falls into.
fn table_region(bbox: &BBox, input: &PageInput, min_overlap: f32) -> Option<usize> {
    input
        .layout
        .iter()
        .position(|l| l.label == LayoutLabel::Table && intersects(bbox, &l.bbox, min_overlap))
}

impl std::fmt::Debug for BlockAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockAssembler")
            .field("options", &self.options)
            .field("cropper", &self.cropper.is_some())
            .finish()
    }
}
