//! Table-of-contents types.

use serde::{Deserialize, Serialize};

/// A flat TOC line after parsing, before tree construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Entry title
    pub title: String,

    /// Nesting level (0 = top level)
    pub level: u32,

    /// First page of the entry, when printed on the TOC page
    pub page_start: Option<u32>,
}

impl TocEntry {
    /// Create a new TOC entry.
    pub fn new(title: impl Into<String>, level: u32, page_start: Option<u32>) -> Self {
        Self {
            title: title.into(),
            level,
            page_start,
        }
    }
}

/// A node of the persisted TOC forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocNode {
    /// Entry title
    pub title: String,

    /// Nesting level (0 = top level)
    pub level: u32,

    /// First page covered by the entry
    #[serde(default)]
    pub page_start: Option<u32>,

    /// Last page covered by the entry
    #[serde(default)]
    pub page_end: Option<u32>,

    /// Child entries
    #[serde(default)]
    pub children: Vec<TocNode>,
}

impl TocNode {
    /// Create a new leaf node.
    pub fn new(title: impl Into<String>, level: u32, page_start: Option<u32>) -> Self {
        Self {
            title: title.into(),
            level,
            page_start,
            page_end: None,
            children: Vec::new(),
        }
    }

    /// Add a child node.
    pub fn add_child(&mut self, child: TocNode) {
        self.children.push(child);
    }
}

/// Total number of nodes in a forest, including nested ones.
pub fn total_nodes(nodes: &[TocNode]) -> usize {
    nodes.iter().map(|n| 1 + total_nodes(&n.children)).sum()
}

/// One TOC node with its root-to-leaf title path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocPath {
    /// Entry title
    pub title: String,

    /// Nesting level
    pub level: u32,

    /// First page covered by the entry
    pub page_start: Option<u32>,

    /// Titles from the root down to this entry
    pub path: Vec<String>,
}
