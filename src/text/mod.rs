//! Input text preparation.
//!
//! Raw text arrives from PDF extraction, web scraping or user input and is
//! full of layout artifacts. [`normalize`] cleans it up, [`chunk`] splits the
//! result into pieces small enough for a single model call.

mod chunk;
mod normalize;

pub use chunk::{chunk, DEFAULT_MAX_CHUNK_CHARS};
pub use normalize::normalize;

/// The first `n` characters of `s`.
pub fn head_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// The last `n` characters of `s`.
pub fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}
