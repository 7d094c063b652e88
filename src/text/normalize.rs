//! Cleanup of raw extracted text.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// `word-\nbreak`, with any whitespace around the line break.
static HYPHEN_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\s*\n\s*").expect("Invalid regex"));

/// Whitespace runs that do not contain a line break.
static INLINE_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\S\n]+").expect("Invalid regex"));

static SPACE_AROUND_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" ?\n ?").expect("Invalid regex"));

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("Invalid regex"));

/// Normalize raw text for prompting.
///
/// Applies NFKC, drops NUL, U+FFFD and other control characters, rejoins
/// words hyphenated across a line break, collapses horizontal whitespace to
/// single spaces while keeping line breaks, caps blank lines so at most two
/// consecutive `\n` remain, and trims. Never fails; empty input gives empty
/// output.
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let text: String = raw
        .nfkc()
        .filter(|c| *c != '\0' && *c != '\u{FFFD}')
        .collect();

    let text = text.replace("\r\n", "\n").replace('\r', "\n");

    // Control characters go before whitespace is collapsed, so none can be
    // left sitting between two spaces. Whitespace controls (tab, form feed)
    // still separate words.
    let text: String = text
        .chars()
        .filter_map(|c| match c {
            '\n' => Some(c),
            c if c.is_control() && c.is_whitespace() => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect();

    let text = HYPHEN_BREAK.replace_all(&text, "");
    let text = INLINE_WHITESPACE.replace_all(&text, " ");
    let text = SPACE_AROUND_NEWLINE.replace_all(&text, "\n");
    let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");

    text.trim().to_string()
}
