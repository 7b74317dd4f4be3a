//! Persisted pipeline artifacts.
//!
//! Layout of an output directory:
//!
//! ```text
//! toc.json              TOC forest
//! blocks/page_NNNN.json ordered blocks of each page
//! text_blocks.json      TOC-tagged text blocks
//! table_blocks.json     TOC-tagged table blocks
//! sections.json         sections in document order
//! tables.json           extracted table contents
//! manifest.json         counts, failures, and generation time
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::json::{read_json, write_json, JsonFormat};
use crate::error::Result;
use crate::model::{Block, DocumentStructure, Section, TocNode, UnitFailure};
use crate::pipeline::blocks_by_page;

/// Summary written next to the artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Library version that produced the output
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub pages: usize,
    pub blocks: usize,
    pub text_blocks: usize,
    pub table_blocks: usize,
    pub sections: usize,
    pub toc_entries: usize,
    pub tables: usize,
    /// Units of work that failed permanently
    pub failures: Vec<UnitFailure>,
}

impl Manifest {
    pub fn for_document(doc: &DocumentStructure) -> Self {
        Self {
            version: crate::VERSION.to_string(),
            generated_at: Utc::now(),
            pages: doc.pages.len(),
            blocks: doc.block_count(),
            text_blocks: doc.text_blocks.len(),
            table_blocks: doc.table_blocks.len(),
            sections: doc.sections.len(),
            toc_entries: doc.toc_entry_count(),
            tables: doc.tables.len(),
            failures: doc.failures.clone(),
        }
    }
}

/// Path of a page's block list inside an output directory.
pub fn page_blocks_path(dir: &Path, page: u32) -> PathBuf {
    dir.join("blocks").join(format!("page_{:04}.json", page))
}

/// Write every artifact of `doc` into `dir`.
pub fn write_artifacts(dir: &Path, doc: &DocumentStructure, format: JsonFormat) -> Result<Manifest> {
    write_json(&dir.join("toc.json"), &doc.toc, format)?;
    for (page, blocks) in &doc.pages {
        write_json(&page_blocks_path(dir, *page), blocks, format)?;
    }
    write_json(&dir.join("text_blocks.json"), &doc.text_blocks, format)?;
    write_json(&dir.join("table_blocks.json"), &doc.table_blocks, format)?;
    write_json(&dir.join("sections.json"), &doc.sections, format)?;
    write_json(&dir.join("tables.json"), &doc.tables, format)?;

    let manifest = Manifest::for_document(doc);
    write_json(&dir.join("manifest.json"), &manifest, format)?;

    log::info!(
        "Wrote {} pages, {} sections to {}",
        manifest.pages,
        manifest.sections,
        dir.display()
    );
    Ok(manifest)
}

/// Read `toc.json`.
pub fn read_toc(path: &Path) -> Result<Vec<TocNode>> {
    read_json(path)
}

/// Read a block list: a single page file or a directory of page files.
pub fn read_blocks(path: &Path) -> Result<Vec<Block>> {
    if !path.is_dir() {
        return read_json(path);
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    files.retain(|p| p.extension().is_some_and(|ext| ext == "json"));
    files.sort();

    let mut blocks = Vec::new();
    for file in files {
        let page: Vec<Block> = read_json(&file)?;
        blocks.extend(page);
    }
    Ok(blocks)
}

/// Read `sections.json`.
pub fn read_sections(path: &Path) -> Result<Vec<Section>> {
    read_json(path)
}

/// Read back the blocks of an output directory, keyed by page.
pub fn read_pages(dir: &Path) -> Result<std::collections::BTreeMap<u32, Vec<Block>>> {
    Ok(blocks_by_page(read_blocks(&dir.join("blocks"))?))
}
