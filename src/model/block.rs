//! Assembled content blocks.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Kind of an assembled block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Prose under the current title
    Text,
    /// A table region, kept as an image crop
    Table,
}

impl BlockKind {
    fn id_prefix(self) -> &'static str {
        match self {
            BlockKind::Text => "blk",
            BlockKind::Table => "tbl",
        }
    }
}

/// A block of document content produced by page assembly.
///
/// Blocks are created once and never mutated; alignment produces tagged copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Deterministic identifier derived from kind, page, and order
    pub block_id: String,

    /// Position on the page, strictly increasing per emitted block
    pub order_id: u32,

    /// Page number (1-indexed)
    pub page: u32,

    /// Block kind
    #[serde(rename = "type")]
    pub kind: BlockKind,

    /// Prose text (text blocks only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Title in effect when the block was emitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Path of the cropped table image (table blocks only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_crop: Option<PathBuf>,

    /// Root-to-leaf TOC titles, assigned during alignment
    #[serde(
        default,
        rename = "toc_path",
        skip_serializing_if = "Option::is_none"
    )]
    pub toc_path: Option<Vec<String>>,
}

impl Block {
    /// Create a text block.
    pub fn text(page: u32, order_id: u32, title: Option<String>, text: impl Into<String>) -> Self {
        Self {
            block_id: block_id(BlockKind::Text, page, order_id),
            order_id,
            page,
            kind: BlockKind::Text,
            text: Some(text.into()),
            title,
            image_crop: None,
            toc_path: None,
        }
    }

    /// Create a table block.
    pub fn table(
        page: u32,
        order_id: u32,
        title: Option<String>,
        image_crop: Option<PathBuf>,
    ) -> Self {
        Self {
            block_id: block_id(BlockKind::Table, page, order_id),
            order_id,
            page,
            kind: BlockKind::Table,
            text: None,
            title,
            image_crop,
            toc_path: None,
        }
    }

    /// Copy of this block tagged with a TOC path.
    pub fn with_toc_path(&self, path: Vec<String>) -> Self {
        Self {
            toc_path: Some(path),
            ..self.clone()
        }
    }

    /// Check if this block is a table.
    pub fn is_table(&self) -> bool {
        self.kind == BlockKind::Table
    }

    /// Text content, or the empty string.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Identifier for the block of `kind` at `order_id` on `page`.
pub fn block_id(kind: BlockKind, page: u32, order_id: u32) -> String {
    format!("{}_{}_{:05}", kind.id_prefix(), page, order_id)
}

/// Sort blocks into global reading order: by page, then by order on the page.
///
/// The sort is stable, so equal keys keep their input order.
pub fn sort_blocks(blocks: &mut [Block]) {
    blocks.sort_by_key(|b| (b.page, b.order_id));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_ids() {
        assert_eq!(block_id(BlockKind::Text, 3, 7), "blk_3_00007");
        assert_eq!(block_id(BlockKind::Table, 12, 0), "tbl_12_00000");
    }

    #[test]
    fn test_block_serialization_shape() {
        let block = Block::text(1, 0, Some("Intro".into()), "Hello");
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["block_id"], "blk_1_00000");
        assert!(json.get("image_crop").is_none());
        assert!(json.get("toc_path").is_none());

        let tagged = block.with_toc_path(vec!["Part I".into()]);
        let json = serde_json::to_value(&tagged).unwrap();
        assert_eq!(json["toc_path"][0], "Part I");
    }

    #[test]
    fn test_sort_blocks() {
        let mut blocks = vec![
            Block::text(2, 0, None, "c"),
            Block::text(1, 1, None, "b"),
            Block::table(1, 0, None, None),
        ];
        sort_blocks(&mut blocks);
        let ids: Vec<_> = blocks.iter().map(|b| b.block_id.as_str()).collect();
        assert_eq!(ids, vec!["tbl_1_00000", "blk_1_00001", "blk_2_00000"]);
    }
}
