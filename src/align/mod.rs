//! TOC alignment of assembled blocks.
//!
//! Blocks from every page are put in global order and walked once. A titled
//! block whose title matches a TOC entry switches the active TOC path, and
//! every block is tagged with the path active when it is reached. Untitled
//! text is folded into the preceding titled text block.

mod sections;

pub use sections::{build_sections, heading_marker};

use std::collections::BTreeSet;

use crate::model::{sort_blocks, Block, BlockKind, TocPath};
use crate::normalize::{NormalizeOptions, TextNormalizer};
use crate::toc::TocForest;

/// Options for [`SectionAligner`].
#[derive(Debug, Clone)]
pub struct AlignOptions {
    /// Pages whose blocks are dropped before alignment
    pub skip_pages: BTreeSet<u32>,

    /// Reject a title match when the block comes before the entry's first page
    pub page_sanity: bool,

    /// Normalization applied to text block contents
    pub normalize: NormalizeOptions,
}

impl AlignOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop blocks on these pages.
    pub fn with_skip_pages(mut self, pages: impl IntoIterator<Item = u32>) -> Self {
        self.skip_pages.extend(pages);
        self
    }

    /// Enable or disable the page sanity check on title matches.
    pub fn with_page_sanity(mut self, enabled: bool) -> Self {
        self.page_sanity = enabled;
        self
    }

    pub fn with_normalize(mut self, normalize: NormalizeOptions) -> Self {
        self.normalize = normalize;
        self
    }
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            skip_pages: BTreeSet::new(),
            page_sanity: true,
            normalize: NormalizeOptions::default(),
        }
    }
}

/// Aligned output: TOC-tagged text and table blocks in global order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedBlocks {
    pub text_blocks: Vec<Block>,
    pub table_blocks: Vec<Block>,
}

/// Tags blocks with TOC paths.
pub struct SectionAligner {
    options: AlignOptions,
    normalizer: TextNormalizer,
    /// Flattened TOC with each entry's title key
    entries: Vec<(String, TocPath)>,
}

impl SectionAligner {
    /// Create an aligner for a resolved TOC forest.
    pub fn new(toc: &TocForest, options: AlignOptions) -> Self {
        Self::from_paths(toc.flatten(), options)
    }

    /// Create an aligner from an already flattened TOC.
    pub fn from_paths(paths: Vec<TocPath>, options: AlignOptions) -> Self {
        let normalizer = TextNormalizer::new(options.normalize.clone());
        let entries = paths
            .into_iter()
            .map(|p| (normalizer.normalize_title(&p.title), p))
            .collect();

        Self {
            options,
            normalizer,
            entries,
        }
    }

    /// The first TOC entry whose title matches `title`.
    pub fn match_title(&self, title: &str, page: u32) -> Option<&TocPath> {
        let key = self.normalizer.normalize_title(title);
        if key.is_empty() {
            return None;
        }

        self.entries
            .iter()
            .filter(|(entry_key, _)| *entry_key == key)
            .map(|(_, path)| path)
            .find(|path| match path.page_start {
                Some(start) if self.options.page_sanity => page >= start,
                _ => true,
            })
    }

    /// Tag, merge, and split blocks from every page.
    pub fn align(&self, mut blocks: Vec<Block>) -> AlignedBlocks {
        sort_blocks(&mut blocks);

        let mut out = AlignedBlocks::default();
        let mut current_path: Vec<String> = Vec::new();
        // Index into `out.text_blocks` of the last titled text block.
        let mut last_titled: Option<usize> = None;
        let mut skipped = 0usize;
        let mut merged = 0usize;

        for block in blocks {
            if self.options.skip_pages.contains(&block.page) {
                skipped += 1;
                continue;
            }

            if let Some(title) = block.title.as_deref() {
                if let Some(entry) = self.match_title(title, block.page) {
                    current_path = entry.path.clone();
                }
            }

            match block.kind {
                BlockKind::Text => {
                    let text = self.normalizer.normalize_text(block.text_or_empty());

                    if let (None, Some(target)) = (&block.title, last_titled) {
                        let target = &mut out.text_blocks[target];
                        let joined = format!("{}\n\n{}", target.text_or_empty(), text);
                        target.text = Some(joined);
                        merged += 1;
                        continue;
                    }

                    let mut tagged = block.with_toc_path(current_path.clone());
                    tagged.text = Some(text);
                    if tagged.title.is_some() {
                        last_titled = Some(out.text_blocks.len());
                    }
                    out.text_blocks.push(tagged);
                }
                BlockKind::Table => {
                    out.table_blocks.push(block.with_toc_path(current_path.clone()));
                }
            }
        }

        log::debug!(
            "Aligned {} text and {} table blocks ({} merged, {} skipped)",
            out.text_blocks.len(),
            out.table_blocks.len(),
            merged,
            skipped
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TocEntry;

    fn forest() -> TocForest {
        crate::toc::build_toc(
            &[
                TocEntry::new("Chapter 1: Origins", 0, Some(1)),
                TocEntry::new("Early Days", 1, Some(2)),
                TocEntry::new("Chapter 2: Growth", 0, Some(5)),
            ],
            10,
        )
    }

    fn titled(page: u32, order: u32, title: &str, text: &str) -> Block {
        Block::text(page, order, Some(title.to_string()), text)
    }

    #[test]
    fn test_match_title_with_synonyms() {
        let aligner = SectionAligner::new(&forest(), AlignOptions::default());
        let entry = aligner.match_title("CH. 1 ORIGINS", 1).unwrap();
        assert_eq!(entry.path, vec!["Chapter 1: Origins".to_string()]);
        assert!(aligner.match_title("Epilogue", 9).is_none());
    }

    #[test]
    fn test_page_sanity_check() {
        let aligner = SectionAligner::new(&forest(), AlignOptions::default());
        // A running mention of chapter 2 on page 3 is not its start.
        assert!(aligner.match_title("Chapter 2: Growth", 3).is_none());
        assert!(aligner.match_title("Chapter 2: Growth", 5).is_some());

        let lenient = SectionAligner::new(&forest(), AlignOptions::new().with_page_sanity(false));
        assert!(lenient.match_title("Chapter 2: Growth", 3).is_some());
    }

    #[test]
    fn test_align_tags_and_merges() {
        let blocks = vec![
            Block::text(5, 0, Some("Chapter 2: Growth".into()), "grow"),
            Block::text(1, 1, None, "more   origins"),
            titled(1, 0, "Chapter 1: Origins", "origins"),
            Block::table(2, 1, None, None),
            titled(2, 0, "Early Days", "early"),
        ];

        let aligned = SectionAligner::new(&forest(), AlignOptions::default()).align(blocks);

        let ids: Vec<&str> = aligned.text_blocks.iter().map(|b| b.block_id.as_str()).collect();
        assert_eq!(ids, vec!["blk_1_00000", "blk_2_00000", "blk_5_00000"]);
        assert_eq!(aligned.text_blocks[0].text.as_deref(), Some("origins\n\nmore origins"));
        assert_eq!(
            aligned.text_blocks[1].toc_path,
            Some(vec!["Chapter 1: Origins".to_string(), "Early Days".to_string()])
        );
        assert_eq!(
            aligned.text_blocks[2].toc_path,
            Some(vec!["Chapter 2: Growth".to_string()])
        );

        assert_eq!(aligned.table_blocks.len(), 1);
        assert_eq!(
            aligned.table_blocks[0].toc_path.as_ref().map(Vec::len),
            Some(2)
        );
    }

    #[test]
    fn test_leading_untitled_text_is_kept() {
        let blocks = vec![
            Block::text(1, 0, None, "front matter"),
            Block::text(1, 1, None, "still front"),
        ];
        let aligned = SectionAligner::new(&TocForest::default(), AlignOptions::default()).align(blocks);
        assert_eq!(aligned.text_blocks.len(), 2);
        assert_eq!(aligned.text_blocks[0].toc_path, Some(vec![]));
    }

    #[test]
    fn test_tables_never_merge() {
        let blocks = vec![
            titled(1, 0, "Intro", "a"),
            Block::table(1, 1, None, None),
            Block::table(1, 2, None, None),
        ];
        let aligned = SectionAligner::new(&TocForest::default(), AlignOptions::default()).align(blocks);
        assert_eq!(aligned.text_blocks.len(), 1);
        assert_eq!(aligned.table_blocks.len(), 2);
    }

    #[test]
    fn test_skip_pages() {
        let blocks = vec![titled(1, 0, "Contents", "toc"), titled(2, 0, "Intro", "body")];
        let aligner = SectionAligner::new(
            &TocForest::default(),
            AlignOptions::new().with_skip_pages([1]),
        );
        let aligned = aligner.align(blocks);
        assert_eq!(aligned.text_blocks.len(), 1);
        assert_eq!(aligned.text_blocks[0].page, 2);
    }
}
