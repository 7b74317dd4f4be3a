//! Table crops cut from rendered page images.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::geometry::BBox;

/// Default padding around a table crop, in pixels.
pub const DEFAULT_CROP_PADDING: u32 = 8;

/// Saves the image area of a table region.
pub trait TableCropper: Send + Sync {
    /// Crop `bbox` out of `page_image` and return where the crop was written.
    fn crop(&self, page_image: &Path, bbox: &BBox, block_id: &str) -> Result<PathBuf>;
}

/// Writes padded PNG crops named `<block_id>.png` into a directory.
#[derive(Debug, Clone)]
pub struct ImageCropper {
    out_dir: PathBuf,
    padding: u32,
}

impl ImageCropper {
    /// Create a cropper writing into `out_dir` with the default padding.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            padding: DEFAULT_CROP_PADDING,
        }
    }

    /// Set the padding added on every side of the table box.
    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    /// Output directory.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

impl TableCropper for ImageCropper {
    fn crop(&self, page_image: &Path, bbox: &BBox, block_id: &str) -> Result<PathBuf> {
        let img = image::open(page_image)?.to_rgb8();
        let (width, height) = img.dimensions();

        let area = bbox.padded(self.padding as f32, width as f32, height as f32);
        let x0 = area.x0.floor().max(0.0) as u32;
        let y0 = area.y0.floor().max(0.0) as u32;
        let x1 = (area.x1.ceil().max(0.0) as u32).min(width);
        let y1 = (area.y1.ceil().max(0.0) as u32).min(height);

        if x1 <= x0 || y1 <= y0 {
            return Err(Error::Other(format!(
                "table box {:?} lies outside the {}x{} page image",
                bbox, width, height
            )));
        }

        let crop = image::imageops::crop_imm(&img, x0, y0, x1 - x0, y1 - y0).to_image();

        fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join(format!("{}.png", block_id));
        crop.save_with_format(&path, image::ImageFormat::Png)?;

        Ok(path)
    }
}
