//! Recovery of structured data from model completions.
//!
//! Models are asked for bare JSON but regularly prepend an explanation or wrap
//! the payload in a markdown fence. [`ResponseExtractor`] runs an ordered list
//! of [`ExtractionStrategy`] implementations over the raw completion and
//! returns the first candidate that parses.

use crate::error::{LecternError, Result};
use crate::text::head_chars;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)\r?\n?```").expect("Invalid regex")
});

/// A way of locating JSON text inside a completion.
pub trait ExtractionStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Candidate substrings to try parsing, best first. Empty when the
    /// strategy does not apply to this input.
    fn candidates<'a>(&self, raw: &'a str) -> Vec<&'a str>;
}

/// Parse the whole (trimmed) completion.
pub struct DirectParse;

impl ExtractionStrategy for DirectParse {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn candidates<'a>(&self, raw: &'a str) -> Vec<&'a str> {
        vec![raw.trim()]
    }
}

/// Parse the interior of the first fenced code block.
pub struct FencedBlock;

impl ExtractionStrategy for FencedBlock {
    fn name(&self) -> &'static str {
        "fenced"
    }

    fn candidates<'a>(&self, raw: &'a str) -> Vec<&'a str> {
        FENCED_BLOCK
            .captures(raw)
            .and_then(|caps| caps.get(1))
            .map(|m| vec![m.as_str().trim()])
            .unwrap_or_default()
    }
}

/// Parse from the first opening bracket to the last matching closing bracket.
///
/// The opener that appears first is tried first; the other kind is tried
/// second so a stray `{` in leading prose does not hide a later array.
pub struct BracketScan;

impl BracketScan {
    fn span(raw: &str, open: char, close: char) -> Option<(usize, &str)> {
        let start = raw.find(open)?;
        let end = raw.rfind(close)?;
        (end > start).then(|| (start, &raw[start..=end]))
    }
}

impl ExtractionStrategy for BracketScan {
    fn name(&self) -> &'static str {
        "bracket"
    }

    fn candidates<'a>(&self, raw: &'a str) -> Vec<&'a str> {
        let mut spans: Vec<(usize, &str)> = [('[', ']'), ('{', '}')]
            .into_iter()
            .filter_map(|(open, close)| Self::span(raw, open, close))
            .collect();
        spans.sort_by_key(|(start, _)| *start);
        spans.into_iter().map(|(_, s)| s).collect()
    }
}

/// Ordered set of extraction strategies.
pub struct ResponseExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for ResponseExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseExtractor {
    /// The standard chain: direct parse, fenced block, bracket scan.
    pub fn new() -> Self {
        Self::empty()
            .with_strategy(DirectParse)
            .with_strategy(FencedBlock)
            .with_strategy(BracketScan)
    }

    /// An extractor with no strategies; every input fails.
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Append a strategy to the end of the chain.
    pub fn with_strategy(mut self, strategy: impl ExtractionStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Recover a JSON value from `raw`.
    pub fn extract(&self, raw: &str) -> Result<Value> {
        for strategy in &self.strategies {
            for candidate in strategy.candidates(raw) {
                match serde_json::from_str::<Value>(candidate) {
                    Ok(value) => {
                        debug!("Extracted structured response via {} strategy", strategy.name());
                        return Ok(value);
                    }
                    Err(e) => {
                        debug!("{} strategy failed: {}", strategy.name(), e);
                    }
                }
            }
        }

        Err(LecternError::Parse(format!(
            "could not recover valid JSON from the model response: {:?}",
            head_chars(raw.trim(), 200)
        )))
    }

    /// Recover and deserialize into `T`.
    pub fn extract_as<T: DeserializeOwned>(&self, raw: &str) -> Result<T> {
        let value = self.extract(raw)?;
        serde_json::from_value(value)
            .map_err(|e| LecternError::Parse(format!("unexpected response shape: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    const TURNS: &str = r#"[{"speaker":"Speaker 1","text":"hi"}]"#;

    #[test]
    fn test_direct_array() {
        let value = ResponseExtractor::new().extract(TURNS).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["speaker"], "Speaker 1");
        assert_eq!(items[0]["text"], "hi");
    }

    #[test]
    fn test_fenced_matches_direct() {
        let extractor = ResponseExtractor::new();
        let fenced = format!("```json\n{}\n```", TURNS);
        assert_eq!(extractor.extract(&fenced).unwrap(), extractor.extract(TURNS).unwrap());

        let untagged = format!("Sure!\n```\n{}\n```\nHope that helps.", TURNS);
        assert_eq!(extractor.extract(&untagged).unwrap(), extractor.extract(TURNS).unwrap());
    }

    #[test]
    fn test_noise_is_parse_error() {
        let err = ResponseExtractor::new().extract("not json at all").unwrap_err();
        assert!(matches!(err, LecternError::Parse(_)));
    }

    #[test]
    fn test_bracket_scan_with_prose() {
        let raw = format!("Here is the dialogue you asked for:\n{}\nLet me know!", TURNS);
        let value = ResponseExtractor::new().extract(&raw).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_bracket_scan_object() {
        let raw = r#"Result: {"topics": ["gravity", "inertia"]} (end)"#;
        let value = ResponseExtractor::new().extract(raw).unwrap();
        assert_eq!(value["topics"][1], "inertia");
    }

    #[test]
    fn test_stray_brace_before_array() {
        let raw = format!("Note {{draft}} below\n{}", TURNS);
        let value = ResponseExtractor::new().extract(&raw).unwrap();
        assert!(value.is_array());
    }

    #[test]
    fn test_broken_fence_falls_through_to_brackets() {
        let raw = format!("```json\nnot quite\n```\nActual: {}", TURNS);
        let value = ResponseExtractor::new().extract(&raw).unwrap();
        assert!(value.is_array());
    }

    #[test]
    fn test_custom_strategy() {
        struct AfterMarker;
        impl ExtractionStrategy for AfterMarker {
            fn name(&self) -> &'static str {
                "marker"
            }
            fn candidates<'a>(&self, raw: &'a str) -> Vec<&'a str> {
                raw.split_once("JSON:").map(|(_, rest)| vec![rest.trim()]).unwrap_or_default()
            }
        }

        let raw = "JSON: 42";
        assert!(ResponseExtractor::empty().extract(raw).is_err());
        let value = ResponseExtractor::empty().with_strategy(AfterMarker).extract(raw).unwrap();
        assert_eq!(value, serde_json::json!(42));
    }

    #[test]
    fn test_extract_as_typed() {
        #[derive(Deserialize)]
        struct Topics {
            topics: Vec<String>,
        }
        let parsed: Topics = ResponseExtractor::new()
            .extract_as(r#"{"topics": ["optics"]}"#)
            .unwrap();
        assert_eq!(parsed.topics, vec!["optics"]);

        let err = ResponseExtractor::new()
            .extract_as::<Topics>(r#"{"other": 1}"#)
            .err()
            .unwrap();
        assert!(matches!(err, LecternError::Parse(_)));
    }
}
