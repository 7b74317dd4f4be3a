//! Sections: runs of blocks sharing one TOC path.

use serde::{Deserialize, Serialize};

/// A contiguous run of text blocks under the same TOC path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Sequential identifier (`sec_000000`, ...)
    pub section_id: String,

    /// Titles from the TOC root down to the section's entry
    pub toc_path: Vec<String>,

    /// Sub-headings found in the text that the TOC does not list
    pub headings: Vec<String>,

    /// Concatenated text of the member blocks
    pub text: String,

    /// Pages touched, in first-seen order
    pub pages: Vec<u32>,

    /// Member block ids, in emission order
    pub block_ids: Vec<String>,
}

impl Section {
    /// Open a new section with its first block.
    pub fn open(
        index: usize,
        toc_path: Vec<String>,
        text: String,
        page: u32,
        block_id: String,
    ) -> Self {
        Self {
            section_id: format!("sec_{:06}", index),
            toc_path,
            headings: Vec::new(),
            text,
            pages: vec![page],
            block_ids: vec![block_id],
        }
    }

    /// Append a block's text to the section.
    pub fn extend(&mut self, text: &str, page: u32, block_id: String) {
        self.text.push_str("\n\n");
        self.text.push_str(text);
        self.block_ids.push(block_id);
        if !self.pages.contains(&page) {
            self.pages.push(page);
        }
    }

    /// Record a heading unless it repeats the previous one.
    pub fn add_heading(&mut self, heading: &str) {
        if self.headings.last().map(String::as_str) != Some(heading) {
            self.headings.push(heading.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_open_and_extend() {
        let mut section = Section::open(3, vec!["A".into()], "one".into(), 4, "blk_4_00000".into());
        assert_eq!(section.section_id, "sec_000003");

        section.extend("two", 4, "blk_4_00001".into());
        section.extend("three", 5, "blk_5_00000".into());

        assert_eq!(section.text, "one\n\ntwo\n\nthree");
        assert_eq!(section.pages, vec![4, 5]);
        assert_eq!(section.block_ids.len(), 3);
    }

    #[test]
    fn test_section_heading_dedup() {
        let mut section = Section::open(0, vec![], String::new(), 1, "b".into());
        section.add_heading("Scope");
        section.add_heading("Scope");
        section.add_heading("Terms");
        section.add_heading("Scope");
        assert_eq!(section.headings, vec!["Scope", "Terms", "Scope"]);
    }
}
