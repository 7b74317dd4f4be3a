//! Document-level results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{total_nodes, Block, ExtractedTable, Section, TocNode};

/// Everything reconstructed for one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentStructure {
    /// TOC forest with resolved page ranges
    pub toc: Vec<TocNode>,

    /// Assembled blocks per page number, each list in emission order
    pub pages: BTreeMap<u32, Vec<Block>>,

    /// Aligned text blocks, untitled prose merged into its titled predecessor
    pub text_blocks: Vec<Block>,

    /// Aligned table blocks
    pub table_blocks: Vec<Block>,

    /// Sections in document order
    pub sections: Vec<Section>,

    /// Extracted table contents
    pub tables: Vec<ExtractedTable>,

    /// Units of work that failed permanently
    pub failures: Vec<UnitFailure>,
}

impl DocumentStructure {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of assembled blocks across all pages.
    pub fn block_count(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    /// Total number of TOC entries.
    pub fn toc_entry_count(&self) -> usize {
        total_nodes(&self.toc)
    }

    /// Check if any unit of work failed.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Pages whose assembly failed.
    pub fn failed_pages(&self) -> Vec<u32> {
        let mut pages: Vec<u32> = self
            .failures
            .iter()
            .filter_map(|f| f.unit.page())
            .collect();
        pages.sort_unstable();
        pages.dedup();
        pages
    }
}

/// A unit of pipeline work that can fail independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkUnit {
    /// OCR, layout, or ordering of one page
    Page {
        /// Page number
        page: u32,
    },
    /// Parsing of one TOC page
    TocPage {
        /// Page number
        page: u32,
    },
    /// Content extraction for one table block
    Table {
        /// Table block id
        block_id: String,
    },
}

impl WorkUnit {
    /// The body page this unit belongs to, if it is a page unit.
    pub fn page(&self) -> Option<u32> {
        match self {
            WorkUnit::Page { page } => Some(*page),
            _ => None,
        }
    }
}

/// A permanently failed unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    /// The failed unit
    pub unit: WorkUnit,

    /// Final error message
    pub error: String,
}

impl UnitFailure {
    /// Record a failure.
    pub fn new(unit: WorkUnit, error: impl ToString) -> Self {
        Self {
            unit,
            error: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_counts() {
        let mut doc = DocumentStructure::new();
        doc.pages.insert(1, vec![Block::text(1, 0, None, "a")]);
        doc.pages
            .insert(2, vec![Block::text(2, 0, None, "b"), Block::table(2, 1, None, None)]);
        assert_eq!(doc.block_count(), 3);
        assert!(!doc.has_failures());
    }

    #[test]
    fn test_failed_pages() {
        let mut doc = DocumentStructure::new();
        doc.failures.push(UnitFailure::new(WorkUnit::Page { page: 3 }, "timeout"));
        doc.failures.push(UnitFailure::new(
            WorkUnit::Table {
                block_id: "tbl_1_00000".into(),
            },
            "malformed",
        ));
        assert_eq!(doc.failed_pages(), vec![3]);
    }

    #[test]
    fn test_work_unit_json() {
        let unit = WorkUnit::Table {
            block_id: "tbl_2_00001".into(),
        };
        let json = serde_json::to_value(&unit).unwrap();
        assert_eq!(json["kind"], "table");
        assert_eq!(json["block_id"], "tbl_2_00001");
    }
}
