//! Table content extraction with an escalating output-size schedule.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::{CallGate, CancellationToken, RetryPolicy, TableExtractor};
use crate::error::{Error, Result};
use crate::model::{Block, ExtractedTable, TableContent};

/// Output-size limits tried in turn, one attempt each.
pub const TOKEN_SCHEDULE: [u32; 3] = [1024, 2048, 4096];

/// Instruction sent with every table image.
const TABLE_SCHEMA: &str = r#"Extract the table from the image and return a JSON object with this schema:

{
  "columns": [string],
  "rows": [
    { column_name: value, ... }
  ],
  "description": string
}

Return JSON only. Keep every value a string. If headers are missing, infer
them from the layout, the TOC path, and the section title. The description
should say what the table represents, what the rows are, and what the
columns mean."#;

/// Prompt for one table block, carrying its TOC path and title as context.
pub fn build_prompt(block: &Block) -> String {
    let toc = block
        .toc_path
        .as_deref()
        .map(|path| path.join(" > "))
        .unwrap_or_default();
    let title = block.title.as_deref().unwrap_or("None");

    format!(
        "Context:\nTOC path: {}\nSection title: {}\n\nTask:\n{}",
        toc, title, TABLE_SCHEMA
    )
}

/// Settings for [`extract_table`].
#[derive(Debug, Clone)]
pub struct TableRequest {
    /// Output-size limits, tried in order
    pub schedule: Vec<u32>,

    /// Backoff used after transient failures
    pub retry: RetryPolicy,

    /// Per-call timeout
    pub timeout: Option<Duration>,

    /// Shared bound on concurrent extractor calls
    pub gate: CallGate,
}

impl Default for TableRequest {
    fn default() -> Self {
        Self {
            schedule: TOKEN_SCHEDULE.to_vec(),
            retry: RetryPolicy::default(),
            timeout: None,
            gate: CallGate::default(),
        }
    }
}

impl TableRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schedule(mut self, schedule: Vec<u32>) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Share a call gate with other provider calls.
    pub fn with_gate(mut self, gate: CallGate) -> Self {
        self.gate = gate;
        self
    }
}

/// Extract the content of a table block.
///
/// Each schedule entry gets one attempt. Malformed output moves on to the
/// next, larger limit; transient errors back off first. A permanent error
/// fails the table at once.
pub fn extract_table(
    extractor: Arc<dyn TableExtractor>,
    block: &Block,
    request: &TableRequest,
    cancel: &CancellationToken,
) -> Result<ExtractedTable> {
    let image: PathBuf = block.image_crop.clone().ok_or_else(|| {
        Error::permanent("table", format!("{} has no image crop", block.block_id))
    })?;
    if request.schedule.is_empty() {
        return Err(Error::InvalidConfig("table size schedule is empty".to_string()));
    }

    let prompt = build_prompt(block);
    let mut last_error = None;

    for (attempt, &max_tokens) in (1u32..).zip(request.schedule.iter()) {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        log::debug!(
            "Extracting {} attempt {}/{} (max_tokens={})",
            block.block_id,
            attempt,
            request.schedule.len(),
            max_tokens
        );

        let call = {
            let extractor = Arc::clone(&extractor);
            let image = image.clone();
            let prompt = prompt.clone();
            move || extractor.extract(&image, &prompt, max_tokens)
        };

        let err = match request.gate.call("table", request.timeout, call)
            .and_then(|raw| TableContent::parse(&raw))
        {
            Ok(content) => {
                return Ok(ExtractedTable {
                    table_id: block.block_id.clone(),
                    toc_path: block.toc_path.clone().unwrap_or_default(),
                    title: block.title.clone(),
                    page: block.page,
                    image_crop: Some(image),
                    content,
                });
            }
            Err(e) => e,
        };

        match err {
            Error::MalformedTable(ref msg) => {
                log::warn!("{}: malformed output at {} tokens: {}", block.block_id, max_tokens, msg);
            }
            ref e if e.is_transient() => {
                let delay = request.retry.delay_for(attempt);
                log::warn!("{}: {} (backing off {:?})", block.block_id, e, delay);
                cancel.sleep(delay)?;
            }
            other => return Err(other),
        }
        last_error = Some(err);
    }

    let attempts = request.schedule.len() as u32;
    Err(Error::RetriesExhausted {
        attempts,
        last: Box::new(last_error.unwrap_or_else(|| Error::Other("no attempts made".into()))),
    })
}
