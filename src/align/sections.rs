//! Grouping aligned text blocks into sections.

use crate::model::{Block, Section};
use crate::normalize::normalize_title;

/// Marker prefixed to text whose heading is not part of the TOC.
pub fn heading_marker(title: &str) -> String {
    format!("<<<HEADING: {} >>>", title)
}

/// Group consecutive text blocks with the same TOC path into sections.
///
/// Blocks with empty text are skipped. A block whose title differs from the
/// leaf of its TOC path is a sub-heading: its text gets a heading marker and
/// the title is recorded in the section's headings.
pub fn build_sections(text_blocks: &[Block]) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut current: Option<Section> = None;

    for block in text_blocks {
        let text = block.text_or_empty().trim();
        if text.is_empty() {
            continue;
        }

        let toc_path: &[String] = block.toc_path.as_deref().unwrap_or(&[]);
        let heading = match (block.title.as_deref(), toc_path.last()) {
            (Some(title), Some(leaf)) if normalize_title(title) != normalize_title(leaf) => {
                Some(title)
            }
            _ => None,
        };

        let text = match heading {
            Some(title) => format!("{}\n\n{}", heading_marker(title), text),
            None => text.to_string(),
        };

        match current.as_mut() {
            Some(section) if section.toc_path == toc_path => {
                section.extend(&text, block.page, block.block_id.clone());
            }
            _ => {
                sections.extend(current.take());
                current = Some(Section::open(
                    sections.len(),
                    toc_path.to_vec(),
                    text,
                    block.page,
                    block.block_id.clone(),
                ));
            }
        }

        if let (Some(title), Some(section)) = (heading, current.as_mut()) {
            section.add_heading(title);
        }
    }

    sections.extend(current);
    log::debug!(
        "Grouped {} text blocks into {} sections",
        text_blocks.len(),
        sections.len()
    );
    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(page: u32, order: u32, title: Option<&str>, path: &[&str], text: &str) -> Block {
        Block::text(page, order, title.map(str::to_string), text)
            .with_toc_path(path.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_sections_follow_path_changes() {
        let blocks = vec![
            block(1, 0, Some("Chapter 1"), &["Chapter 1"], "a"),
            block(2, 0, Some("Ch. 1"), &["Chapter 1"], "b"),
            block(3, 0, Some("Chapter 2"), &["Chapter 2"], "c"),
            block(4, 0, None, &["Chapter 1"], "d"),
        ];
        let sections = build_sections(&blocks);

        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].section_id, "sec_000000");
        assert_eq!(sections[0].text, "a\n\nb");
        assert_eq!(sections[0].pages, vec![1, 2]);
        assert!(sections[0].headings.is_empty());
        assert_eq!(sections[2].section_id, "sec_000002");
        assert_eq!(sections[2].block_ids, vec!["blk_4_00000".to_string()]);
    }

    #[test]
    fn test_sub_heading_marker() {
        let blocks = vec![
            block(1, 0, Some("Chapter 1"), &["Chapter 1"], "intro"),
            block(1, 1, Some("Background"), &["Chapter 1"], "details"),
            block(2, 0, Some("Background"), &["Chapter 1"], "more"),
        ];
        let sections = build_sections(&blocks);

        assert_eq!(sections.len(), 1);
        assert_eq!(
            sections[0].text,
            "intro\n\n<<<HEADING: Background >>>\n\ndetails\n\n<<<HEADING: Background >>>\n\nmore"
        );
        assert_eq!(sections[0].headings, vec!["Background".to_string()]);
    }

    #[test]
    fn test_empty_text_and_empty_path() {
        let blocks = vec![
            block(1, 0, Some("Preface"), &[], "front"),
            block(1, 1, Some("Blank"), &["Part"], "   "),
        ];
        let sections = build_sections(&blocks);

        assert_eq!(sections.len(), 1);
        assert!(sections[0].toc_path.is_empty());
        // No TOC leaf, so no marker.
        assert_eq!(sections[0].text, "front");
    }
}
