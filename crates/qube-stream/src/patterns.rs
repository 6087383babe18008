//! Progress classification patterns
//!
//! Compiled once behind `OnceLock`; the processor runs these against the
//! final carriage-return segment of every chunk.

use regex::Regex;
use std::sync::OnceLock;

/// Braille spinner glyph followed by text ending in `...`
pub fn spinner() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏].*\.{3}").expect("invalid regex"))
}

/// `Loading...` (case-insensitive)
pub fn loading() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)Loading\.{3}").expect("invalid regex"))
}

/// `Processing...` (case-insensitive)
pub fn processing() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)Processing\.{3}").expect("invalid regex"))
}

/// Long-running I/O phases (case-insensitive)
pub fn io_transfer() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(Downloading|Uploading|Indexing)").expect("invalid regex"))
}

/// The sustained "Thinking" animation (case-insensitive)
pub fn thinking() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)Thinking").expect("invalid regex"))
}

/// Whether `text` matches any non-thinking progress pattern.
pub fn is_progress(text: &str) -> bool {
    spinner().is_match(text)
        || loading().is_match(text)
        || processing().is_match(text)
        || io_transfer().is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_requires_trailing_dots() {
        assert!(spinner().is_match("⠋ Loading..."));
        assert!(spinner().is_match("⠧ fetching context..."));
        assert!(!spinner().is_match("⠋ Loading"));
        assert!(!spinner().is_match("Loading..."));
    }

    #[test]
    fn loading_and_processing_are_case_insensitive() {
        assert!(loading().is_match("loading..."));
        assert!(loading().is_match("LOADING..."));
        assert!(processing().is_match("processing..."));
        assert!(!processing().is_match("processing"));
    }

    #[test]
    fn io_transfer_matches_without_dots() {
        assert!(io_transfer().is_match("Downloading model weights"));
        assert!(io_transfer().is_match("indexing workspace"));
        assert!(!io_transfer().is_match("Upload complete"));
        assert!(io_transfer().is_match("Uploading"));
    }

    #[test]
    fn thinking_matches_anywhere() {
        assert!(thinking().is_match("Thinking..."));
        assert!(thinking().is_match("⠙ thinking"));
        assert!(!thinking().is_match("thought"));
    }
}
