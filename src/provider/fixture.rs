//! Precomputed provider results stored on disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use super::{LayoutProvider, OcrProvider, PageSource};
use crate::error::{Error, Result};
use crate::model::{LayoutRegion, OcrRegion};

/// A directory of per-page fixtures.
///
/// Page `n` is described by `page_NNNN.png`, `page_NNNN.ocr.json`, and
/// `page_NNNN.layout.json` (zero-padded to four digits). Missing OCR or
/// layout files read as empty region lists.
#[derive(Debug, Clone)]
pub struct FixtureDir {
    root: PathBuf,
}

impl FixtureDir {
    /// Open a fixture directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::InvalidConfig(format!(
                "fixture directory {} does not exist",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a page file with the given suffix, e.g. `ocr.json`.
    pub fn page_file(&self, page: u32, suffix: &str) -> PathBuf {
        self.root.join(format!("page_{:04}.{}", page, suffix))
    }

    fn read_regions<T: DeserializeOwned>(&self, page: u32, suffix: &str) -> Result<Vec<T>> {
        let path = self.page_file(page, suffix);
        if !path.exists() {
            log::debug!("No {} fixture for page {}", suffix, page);
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// Page number encoded in a fixture file name.
fn page_number(name: &str) -> Option<u32> {
    let rest = name.strip_prefix("page_")?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() || !rest[digits.len()..].starts_with('.') {
        return None;
    }
    digits.parse().ok()
}

impl PageSource for FixtureDir {
    fn page_count(&self) -> Result<u32> {
        let mut last = 0;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if let Some(page) = entry.file_name().to_str().and_then(page_number) {
                last = last.max(page);
            }
        }
        Ok(last)
    }

    fn page_image(&self, page: u32) -> Result<Option<PathBuf>> {
        let path = self.page_file(page, "png");
        Ok(path.exists().then_some(path))
    }
}

impl OcrProvider for FixtureDir {
    fn ocr_page(&self, page: u32) -> Result<Vec<OcrRegion>> {
        self.read_regions(page, "ocr.json")
    }
}

impl LayoutProvider for FixtureDir {
    fn detect_page(&self, page: u32, _image: Option<&Path>) -> Result<Vec<LayoutRegion>> {
        self.read_regions(page, "layout.json")
    }
}
