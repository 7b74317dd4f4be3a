//! Data model shared by every stage.
//!
//! Regions are read-only per-page inputs. Blocks are produced once by page
//! assembly and only copied (never edited) afterwards. TOC nodes, sections and
//! extracted tables make up the persisted document structure.

mod block;
mod document;
mod page;
mod region;
mod section;
mod table;
mod toc;

pub use block::{block_id, sort_blocks, Block, BlockKind};
pub use document::{DocumentStructure, UnitFailure, WorkUnit};
pub use page::PageInput;
pub use region::{filter_by_confidence, font_key, LayoutLabel, LayoutRegion, OcrRegion};
pub use section::Section;
pub use table::{ExtractedTable, TableContent};
pub use toc::{total_nodes, TocEntry, TocNode, TocPath};
