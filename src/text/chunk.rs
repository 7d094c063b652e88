//! Line-boundary chunking.

/// Default maximum chunk size, in characters.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 10_000;

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Text that already fits is returned as a single chunk. Longer text is split
/// on `\n` and lines are packed greedily. A line longer than `max_chars` is
/// never cut: it gets a chunk of its own and that chunk exceeds the limit.
/// Joining the result with `\n` gives back the input exactly. Empty input
/// yields no chunks.
pub fn chunk(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    // Counts one separator per line, so it runs one ahead of the joined length.
    let mut current_len = 0usize;

    for line in text.split('\n') {
        let line_len = line.chars().count();

        if current_len + line_len + 1 > max_chars && !current.is_empty() {
            chunks.push(current.join("\n"));
            current.clear();
            current_len = 0;
        }

        current.push(line);
        current_len += line_len + 1;
    }

    if !current.is_empty() {
        chunks.push(current.join("\n"));
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_chunk() {
        let text = "Gravity pulls.\n\nInertia resists.";
        assert_eq!(chunk(text, 100), vec![text.to_string()]);
        assert_eq!(chunk(text, text.len()), vec![text.to_string()]);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(chunk("", 10).is_empty());
    }

    #[test]
    fn test_packs_lines_greedily() {
        let text = "aaaa\nbbbb\ncccc\ndddd";
        let chunks = chunk(text, 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb", "cccc\ndddd"]);
    }

    #[test]
    fn test_chunks_respect_limit_and_rejoin() {
        let lines: Vec<String> = (0..200)
            .map(|i| format!("Line {} talks about orbital mechanics.", i))
            .collect();
        let text = lines.join("\n");

        let chunks = chunk(&text, 500);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 500, "chunk too long: {}", c.len());
        }
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn test_overlong_line_kept_whole() {
        let long = "x".repeat(50);
        let text = format!("short\n{}\ntail", long);

        let chunks = chunk(&text, 20);
        assert_eq!(chunks, vec!["short".to_string(), long.clone(), "tail".to_string()]);
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn test_paragraph_breaks_survive() {
        let text = "first paragraph\n\nsecond paragraph\n\nthird paragraph";
        let chunks = chunk(text, 20);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // Each line is 5 chars but 10 bytes.
        let text = "ééééé\nééééé";
        assert_eq!(chunk(text, 11).len(), 1);
        assert_eq!(chunk(text, 8).len(), 2);
    }
}
