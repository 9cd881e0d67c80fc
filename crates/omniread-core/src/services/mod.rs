//! Call sites that drive the gateway: chapter generation, source scanning,
//! and reader assistance. Each degrades to a default value instead of
//! failing.

mod assist;
mod chapter;
mod scanner;

pub use assist::{ReaderAssist, TranslationMode};
pub use chapter::{ChapterContent, ChapterService};
pub use scanner::{ScanKind, ScannerService};

use regex::Regex;
use std::sync::OnceLock;

static HTML_TAG_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_html_tag_regex() -> &'static Regex {
    HTML_TAG_REGEX.get_or_init(|| Regex::new(r"<[^>]*>").expect("HTML tag regex is valid"))
}

/// Drop markup and keep at most `max_chars` characters.
pub(crate) fn plain_excerpt(html: &str, max_chars: usize) -> String {
    get_html_tag_regex().replace_all(html, "").chars().take(max_chars).collect()
}

/// First `max_chars` characters of `text`.
pub(crate) fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_excerpt_strips_tags() {
        assert_eq!(plain_excerpt("<p>The <b>sword</b> fell.</p>", 100), "The sword fell.");
        assert_eq!(plain_excerpt("<p>abcdef</p>", 3), "abc");
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("修仙世界", 2), "修仙");
    }
}
