//! Writing and reading pipeline output.

mod artifacts;
mod json;

pub use artifacts::{
    page_blocks_path, read_blocks, read_pages, read_sections, read_toc, write_artifacts, Manifest,
};
pub use json::{read_json, to_json, write_json, JsonFormat};
