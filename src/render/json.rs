//! JSON encoding of pipeline output.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Convert a value to JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value),
        JsonFormat::Compact => serde_json::to_string(value),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

/// Write a value as JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, format: JsonFormat) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, to_json(value, format)?)?;
    Ok(())
}

/// Read a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Block;

    #[test]
    fn test_to_json_formats() {
        let blocks = vec![Block::text(1, 0, Some("Intro".into()), "Hello")];

        let pretty = to_json(&blocks, JsonFormat::Pretty).unwrap();
        assert!(pretty.contains("\"block_id\": \"blk_1_00000\""));
        assert!(pretty.contains('\n'));

        let compact = to_json(&blocks, JsonFormat::Compact).unwrap();
        assert!(!compact.contains('\n'));
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/blocks.json");
        let blocks = vec![Block::table(2, 3, None, None)];

        write_json(&path, &blocks, JsonFormat::Compact).unwrap();
        let back: Vec<Block> = read_json(&path).unwrap();
        assert_eq!(back, blocks);
    }
}
