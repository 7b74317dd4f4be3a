//! TOC forest construction and page-range resolution.
//!
//! The forest is an arena: nodes live in a flat vector in input (pre-)order
//! and refer to their children by index. A child therefore always has a
//! larger index than its parent, which lets the page-range passes walk the
//! arena linearly instead of recursing.

use crate::model::{TocEntry, TocNode, TocPath};

#[derive(Debug, Clone, PartialEq, Eq)]
struct ArenaNode {
    title: String,
    level: u32,
    page_start: Option<u32>,
    page_end: Option<u32>,
    children: Vec<usize>,
}

/// A table-of-contents forest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TocForest {
    nodes: Vec<ArenaNode>,
    roots: Vec<usize>,
}

impl TocForest {
    /// Build the forest from flat entries.
    ///
    /// An entry becomes a child of the closest preceding entry with a
    /// smaller level, or a root when there is none. Any level sequence is
    /// accepted.
    pub fn build_tree(entries: &[TocEntry]) -> Self {
        let mut forest = TocForest::default();
        let mut stack: Vec<usize> = Vec::new();

        for entry in entries {
            let index = forest.nodes.len();
            forest.nodes.push(ArenaNode {
                title: entry.title.clone(),
                level: entry.level,
                page_start: entry.page_start,
                page_end: None,
                children: Vec::new(),
            });

            while let Some(&top) = stack.last() {
                if forest.nodes[top].level >= entry.level {
                    stack.pop();
                } else {
                    break;
                }
            }

            match stack.last() {
                Some(&parent) => forest.nodes[parent].children.push(index),
                None => forest.roots.push(index),
            }
            stack.push(index);
        }

        forest
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of top-level nodes.
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Resolve `page_start` and `page_end` for every node.
    ///
    /// Missing starts are inherited from the first child. Each node then ends
    /// one page before its next sibling starts, or at its parent's end (the
    /// document's `last_page` for roots).
    pub fn compute_page_ranges(&mut self, last_page: u32) {
        let starts = self.filled_starts();
        let ends = self.assigned_ends(&starts, last_page);

        for ((node, start), end) in self.nodes.iter_mut().zip(starts).zip(ends) {
            node.page_start = start;
            node.page_end = end;
        }
    }

    /// Bottom-up pass: a node without a start takes its first child's.
    fn filled_starts(&self) -> Vec<Option<u32>> {
        let mut starts: Vec<Option<u32>> = self.nodes.iter().map(|n| n.page_start).collect();

        // Children sit after their parent, so a reverse walk sees them first.
        for index in (0..self.nodes.len()).rev() {
            if starts[index].is_none() {
                if let Some(&first) = self.nodes[index].children.first() {
                    starts[index] = starts[first];
                }
            }
        }
        starts
    }

    /// Top-down pass over sibling lists with an inherited closing bound.
    fn assigned_ends(&self, starts: &[Option<u32>], last_page: u32) -> Vec<Option<u32>> {
        let mut ends: Vec<Option<u32>> = vec![None; self.nodes.len()];
        let mut pending: Vec<(&[usize], u32)> = vec![(self.roots.as_slice(), last_page)];

        while let Some((siblings, bound)) = pending.pop() {
            for (pos, &index) in siblings.iter().enumerate() {
                let start = starts[index];
                let next_start = siblings.get(pos + 1).and_then(|&next| starts[next]);

                let mut end = match (start, next_start) {
                    (Some(start), Some(next)) if next > start => next - 1,
                    (None, Some(next)) => next.saturating_sub(1),
                    _ => bound,
                };
                if let Some(start) = start {
                    end = end.max(start);
                }

                ends[index] = Some(end);
                if !self.nodes[index].children.is_empty() {
                    pending.push((self.nodes[index].children.as_slice(), end));
                }
            }
        }
        ends
    }

    /// The forest as nested nodes.
    pub fn to_nodes(&self) -> Vec<TocNode> {
        self.roots.iter().map(|&root| self.node_at(root)).collect()
    }

    fn node_at(&self, index: usize) -> TocNode {
        let node = &self.nodes[index];
        TocNode {
            title: node.title.clone(),
            level: node.level,
            page_start: node.page_start,
            page_end: node.page_end,
            children: node.children.iter().map(|&c| self.node_at(c)).collect(),
        }
    }

    /// Every node with its root-to-node title path, in pre-order.
    pub fn flatten(&self) -> Vec<TocPath> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut path = Vec::new();
        for &root in &self.roots {
            self.flatten_into(root, &mut path, &mut out);
        }
        out
    }

    fn flatten_into(&self, index: usize, path: &mut Vec<String>, out: &mut Vec<TocPath>) {
        let node = &self.nodes[index];
        path.push(node.title.clone());
        out.push(TocPath {
            title: node.title.clone(),
            level: node.level,
            page_start: node.page_start,
            path: path.clone(),
        });
        for &child in &node.children {
            self.flatten_into(child, path, out);
        }
        path.pop();
    }
}

impl From<&[TocNode]> for TocForest {
    /// Rebuild the arena from a nested forest, e.g. one loaded from `toc.json`.
    fn from(roots: &[TocNode]) -> Self {
        fn push(forest: &mut TocForest, node: &TocNode) -> usize {
            let index = forest.nodes.len();
            forest.nodes.push(ArenaNode {
                title: node.title.clone(),
                level: node.level,
                page_start: node.page_start,
                page_end: node.page_end,
                children: Vec::new(),
            });
            let children: Vec<usize> = node.children.iter().map(|c| push(forest, c)).collect();
            forest.nodes[index].children = children;
            index
        }

        let mut forest = TocForest::default();
        for root in roots {
            let index = push(&mut forest, root);
            forest.roots.push(index);
        }
        forest
    }
}
