//! TOC line parsing.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::Result;
use crate::geometry::{intersects, DEFAULT_MIN_OVERLAP};
use crate::model::{LayoutLabel, OcrRegion, PageInput, TocEntry};
use crate::order::validate_permutation;

/// Headings of the contents page itself.
const NOISE_TITLES: [&str; 2] = ["CONTENTS", "TABLE OF CONTENTS"];

/// Options for TOC parsing.
#[derive(Debug, Clone)]
pub struct TocOptions {
    /// Minimum overlap of a line with a content region
    pub min_overlap: f32,

    /// Drop "CONTENTS" / "TABLE OF CONTENTS" headings
    pub filter_noise: bool,

    /// Drop lines whose font size is at or below this size (running footers)
    pub min_font_size: Option<f32>,
}

impl TocOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable the heading filter and drop lines at or below `min_font_size`.
    pub fn with_noise_filter(mut self, min_font_size: Option<f32>) -> Self {
        self.filter_noise = true;
        self.min_font_size = min_font_size;
        self
    }

    pub fn with_min_overlap(mut self, min_overlap: f32) -> Self {
        self.min_overlap = min_overlap;
        self
    }
}

impl Default for TocOptions {
    fn default() -> Self {
        Self {
            min_overlap: DEFAULT_MIN_OVERLAP,
            filter_noise: false,
            min_font_size: None,
        }
    }
}

fn toc_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<title>.+?)\.{2,}\s*(?P<page>\d+)$")
            .unwrap_or_else(|e| panic!("invalid TOC line pattern: {e}"))
    })
}

fn dot_leader_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\.{2,}\s*$").unwrap_or_else(|e| panic!("invalid dot leader pattern: {e}"))
    })
}

/// Parse the TOC pages into flat entries.
///
/// Pages are read in the order given and form one continuous line stream.
/// Only lines inside a `content` layout region are considered.
pub fn parse_toc_pages(pages: &[PageInput], options: &TocOptions) -> Result<Vec<TocEntry>> {
    let mut lines = Vec::new();

    for page in pages {
        let sequence: Vec<usize> = if page.reading_order.is_empty() {
            (0..page.ocr.len()).collect()
        } else {
            validate_permutation(&page.reading_order, page.ocr.len())?;
            page.reading_order.clone()
        };

        let contents: Vec<_> = page
            .layout
            .iter()
            .filter(|l| l.label == LayoutLabel::Content)
            .collect();

        lines.extend(sequence.into_iter().map(|i| &page.ocr[i]).filter(|ocr| {
            contents
                .iter()
                .any(|l| intersects(&ocr.bbox, &l.bbox, options.min_overlap))
        }));
    }

    let entries = parse_toc_lines(&lines, options);
    log::debug!(
        "Parsed {} TOC entries from {} lines on {} pages",
        entries.len(),
        lines.len(),
        pages.len()
    );
    Ok(entries)
}

/// Parse already filtered TOC lines, given in reading order.
///
/// Levels come from the rank of each line's font size among the distinct
/// sizes seen, largest first. Lines without a font size rank below all others.
pub fn parse_toc_lines(lines: &[&OcrRegion], options: &TocOptions) -> Vec<TocEntry> {
    let lines: Vec<&OcrRegion> = lines
        .iter()
        .copied()
        .filter(|l| !l.text.trim().is_empty() && !is_noise(l, options))
        .collect();

    let sizes: BTreeSet<i32> = lines.iter().filter_map(|l| l.font_key()).collect();
    let level_of = |line: &OcrRegion| -> u32 {
        let rank = match line.font_key() {
            Some(key) => sizes.iter().rev().position(|&k| k == key).unwrap_or(0),
            None => sizes.len(),
        };
        rank as u32
    };

    let mut entries: Vec<TocEntry> = Vec::new();
    for line in lines {
        let raw = line.text.trim();
        let text = dot_leader_re().replace(raw, "");
        let text = text.trim_end();

        // A bare page number belongs to the entry before it.
        if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
            match (entries.last_mut(), text.parse::<u32>()) {
                (Some(last), Ok(page)) if last.page_start.is_none() => last.page_start = Some(page),
                _ => log::debug!("Dropping stray TOC page number {:?}", text),
            }
            continue;
        }

        let entry = match toc_line_re().captures(text) {
            Some(caps) => {
                let title = caps["title"].trim().to_string();
                let page = caps["page"].parse::<u32>().ok();
                TocEntry::new(title, level_of(line), page)
            }
            None => TocEntry::new(text, level_of(line), None),
        };
        entries.push(entry);
    }

    entries
}

fn is_noise(line: &OcrRegion, options: &TocOptions) -> bool {
    if !options.filter_noise {
        return false;
    }

    let upper = line.text.trim().to_uppercase();
    if NOISE_TITLES.contains(&upper.as_str()) {
        return true;
    }

    match (options.min_font_size, line.font_size) {
        (Some(min), Some(size)) => size <= min,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LayoutRegion;

    fn line(text: &str, y: f32, size: f32) -> OcrRegion {
        OcrRegion::new(text, [0.0, y, 200.0, y + 10.0], Some(size))
    }

    fn parse(lines: &[OcrRegion]) -> Vec<TocEntry> {
        let refs: Vec<&OcrRegion> = lines.iter().collect();
        parse_toc_lines(&refs, &TocOptions::default())
    }

    #[test]
    fn test_levels_follow_font_rank() {
        let entries = parse(&[
            line("Part One ........ 1", 0.0, 14.0),
            line("Chapter 1 ..... 3", 10.0, 12.0),
            line("Section 1.1 .. 4", 20.0, 10.0),
            line("Chapter 2 ..... 9", 30.0, 12.0),
        ]);

        let levels: Vec<u32> = entries.iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![0, 1, 2, 1]);
        assert_eq!(entries[1], TocEntry::new("Chapter 1", 1, Some(3)));
    }

    #[test]
    fn test_page_number_on_its_own_line() {
        let entries = parse(&[
            line("Preface ......", 0.0, 12.0),
            line("vii", 10.0, 12.0),
            line("Introduction .....", 20.0, 12.0),
            line("1", 30.0, 12.0),
            line("2", 40.0, 12.0),
        ]);

        assert_eq!(
            entries,
            vec![
                TocEntry::new("Preface", 0, None),
                TocEntry::new("vii", 0, None),
                TocEntry::new("Introduction", 0, Some(1)),
            ]
        );
    }

    #[test]
    fn test_malformed_line_is_title_only() {
        let entries = parse(&[line("Appendix without page", 0.0, 11.0)]);
        assert_eq!(entries, vec![TocEntry::new("Appendix without page", 0, None)]);
    }

    #[test]
    fn test_noise_filter_is_opt_in() {
        let lines = [
            line("CONTENTS", 0.0, 18.0),
            line("Chapter 1 .... 3", 10.0, 12.0),
            line("printed in xyz", 20.0, 6.0),
        ];
        let refs: Vec<&OcrRegion> = lines.iter().collect();

        assert_eq!(parse_toc_lines(&refs, &TocOptions::default()).len(), 3);

        let filtered = parse_toc_lines(&refs, &TocOptions::new().with_noise_filter(Some(7.0)));
        assert_eq!(filtered, vec![TocEntry::new("Chapter 1", 0, Some(3))]);
    }

    #[test]
    fn test_pages_keep_only_content_lines() {
        let page = PageInput::new(2)
            .with_ocr(vec![
                line("Chapter 2 .... 9", 50.0, 12.0),
                line("Chapter 1 .... 3", 30.0, 12.0),
                line("2", 290.0, 8.0),
            ])
            .with_layout(vec![
                LayoutRegion::new("content", [0.0, 20.0, 200.0, 100.0]),
                LayoutRegion::new("number", [0.0, 285.0, 200.0, 300.0]),
            ])
            .with_reading_order(vec![1, 0, 2]);

        let entries = parse_toc_pages(&[page], &TocOptions::default()).unwrap();
        let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Chapter 1", "Chapter 2"]);
    }

    #[test]
    fn test_pages_form_one_stream() {
        let first = PageInput::new(2)
            .with_ocr(vec![line("Chapter 9 .....", 0.0, 12.0)])
            .with_layout(vec![LayoutRegion::new("content", [0.0, 0.0, 200.0, 300.0])]);
        let second = PageInput::new(3)
            .with_ocr(vec![line("140", 0.0, 12.0)])
            .with_layout(vec![LayoutRegion::new("content", [0.0, 0.0, 200.0, 300.0])]);

        let entries = parse_toc_pages(&[first, second], &TocOptions::default()).unwrap();
        assert_eq!(entries, vec![TocEntry::new("Chapter 9", 0, Some(140))]);
    }
}
