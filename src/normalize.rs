//! Text and title normalization for OCR output.
//!
//! [`normalize_text`] cleans prose before it is persisted. [`normalize_title`]
//! produces a matching key so that a heading found on a page can be looked up
//! in the table of contents despite casing, punctuation, and "Chapter"/"Ch."
//! spelling differences.

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Typographic characters replaced after NFKC normalization.
const REPLACEMENTS: [(char, &str); 8] = [
    ('\u{201C}', "\""), // “
    ('\u{201D}', "\""), // ”
    ('\u{2018}', "'"),  // ‘
    ('\u{2019}', "'"),  // ’
    ('\u{00B4}', "'"),  // ´
    ('\u{2013}', "-"),  // –
    ('\u{2014}', "-"),  // —
    ('\u{2026}', "..."),
];

/// Options for prose normalization.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Strip ASCII control characters (tabs and newlines are kept)
    pub remove_control_chars: bool,

    /// Apply NFKC and replace curly quotes, dashes, and ellipses
    pub normalize_unicode: bool,

    /// Replace bullet glyphs with `-`
    pub normalize_bullets: bool,

    /// Join words split by a hyphen and a line break ("cit- ies" → "cities")
    pub fix_hyphenation: bool,

    /// Collapse runs of spaces and blank lines, then trim
    pub normalize_whitespace: bool,
}

impl NormalizeOptions {
    /// Create options with every stage enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that only touch whitespace.
    pub fn whitespace_only() -> Self {
        Self {
            remove_control_chars: false,
            normalize_unicode: false,
            normalize_bullets: false,
            fix_hyphenation: false,
            normalize_whitespace: true,
        }
    }
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            remove_control_chars: true,
            normalize_unicode: true,
            normalize_bullets: true,
            fix_hyphenation: true,
            normalize_whitespace: true,
        }
    }
}

/// Compiled normalization pipeline.
pub struct TextNormalizer {
    options: NormalizeOptions,
    control_chars: Regex,
    hyphen_break: Regex,
    bullets: Regex,
    multi_space: Regex,
    multi_newline: Regex,
    chapter_word: Regex,
    chapter_abbrev: Regex,
    punctuation: Regex,
    any_space: Regex,
}

impl TextNormalizer {
    /// Create a normalizer with the given options.
    pub fn new(options: NormalizeOptions) -> Self {
        Self {
            options,
            control_chars: compile(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]"),
            hyphen_break: compile(r"(\w+)-\s+([a-z])"),
            bullets: compile(r"[•◦∙·‣▪▫–—]"),
            multi_space: compile(r"[ \t]{2,}"),
            multi_newline: compile(r"\n{3,}"),
            chapter_word: compile(r"\bchapter\b"),
            chapter_abbrev: compile(r"\bch\."),
            punctuation: compile(r"[^\w\s]"),
            any_space: compile(r"\s+"),
        }
    }

    /// Clean OCR prose.
    pub fn normalize_text(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let mut result = text.to_string();

        if self.options.remove_control_chars {
            result = self.control_chars.replace_all(&result, "").into_owned();
        }

        if self.options.normalize_unicode {
            result = result.nfkc().collect();
            for (from, to) in REPLACEMENTS {
                if result.contains(from) {
                    result = result.replace(from, to);
                }
            }
        }

        if self.options.normalize_bullets {
            result = self.bullets.replace_all(&result, "-").into_owned();
        }

        if self.options.fix_hyphenation {
            // Repeat until stable: one pass cannot join overlapping matches.
            loop {
                let next = self.hyphen_break.replace_all(&result, "${1}${2}");
                if next == result {
                    break;
                }
                result = next.into_owned();
            }
        }

        if self.options.normalize_whitespace {
            result = self.multi_space.replace_all(&result, " ").into_owned();
            result = self.multi_newline.replace_all(&result, "\n\n").into_owned();
            result = result.trim().to_string();
        }

        result
    }

    /// Matching key for a title.
    ///
    /// Lowercases, maps "chapter" and "ch." to "ch", drops punctuation, and
    /// collapses whitespace.
    pub fn normalize_title(&self, title: &str) -> String {
        let lower = title.to_lowercase();
        let text = self.chapter_word.replace_all(&lower, "ch");
        let text = self.chapter_abbrev.replace_all(&text, "ch");
        let text = self.punctuation.replace_all(&text, "");
        let text = self.any_space.replace_all(&text, " ");
        text.trim().to_string()
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(NormalizeOptions::default())
    }
}

fn compile(pattern: &str) -> Regex {
    // Patterns are literals in this module; a failure is a programming error.
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern}: {e}"))
}

fn default_normalizer() -> &'static TextNormalizer {
    static NORMALIZER: OnceLock<TextNormalizer> = OnceLock::new();
    NORMALIZER.get_or_init(TextNormalizer::default)
}

/// Clean OCR prose with the default options.
pub fn normalize_text(text: &str) -> String {
    default_normalizer().normalize_text(text)
}

/// Matching key for a title, with the default normalizer.
pub fn normalize_title(title: &str) -> String {
    default_normalizer().normalize_title(title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chapter_synonyms_match() {
        assert_eq!(
            normalize_title("Chapter 3: The Great War"),
            normalize_title("Ch. 3 The Great War")
        );
        assert_eq!(normalize_title("Chapter 3: The Great War"), "ch 3 the great war");
    }

    #[test]
    fn test_title_punctuation_and_spacing() {
        assert_eq!(normalize_title("  1.2   Scope &  Purpose! "), "12 scope purpose");
        assert_eq!(normalize_title("CHAPTER ONE"), "ch one");
        // "chapters" is a different word
        assert_eq!(normalize_title("Chapters"), "chapters");
    }

    #[test]
    fn test_ch_abbreviation_inside_words_untouched() {
        assert_eq!(normalize_title("Approach"), "approach");
        assert_eq!(normalize_title("Ch.4"), "ch4");
    }

    #[test]
    fn test_hyphenated_linebreaks() {
        assert_eq!(normalize_text("the cit- ies of the plain"), "the cities of the plain");
        assert_eq!(normalize_text("infor-\nmation"), "information");
        // Uppercase continuation is a real hyphen.
        assert_eq!(normalize_text("Franco- Prussian"), "Franco- Prussian");
    }

    #[test]
    fn test_unicode_and_quotes() {
        assert_eq!(normalize_text("“quoted” — it’s…"), "\"quoted\" - it's...");
        // NFKC folds ligatures.
        assert_eq!(normalize_text("ﬁnding"), "finding");
    }

    #[test]
    fn test_bullets_and_whitespace() {
        assert_eq!(normalize_text("• one   two"), "- one two");
        assert_eq!(normalize_text("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(normalize_text("\x07bell\x00"), "bell");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_whitespace_only_options() {
        let normalizer = TextNormalizer::new(NormalizeOptions::whitespace_only());
        assert_eq!(normalizer.normalize_text("• cit- ies   x"), "• cit- ies x");
    }
}
