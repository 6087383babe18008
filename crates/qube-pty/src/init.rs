//! Initialization detection
//!
//! The Q CLI renders a styled greeting banner before it is ready for
//! input. The detector strips ANSI sequences and declares the session
//! initialized when it sees either the greeting phrase or a long run of
//! box-drawing characters followed by a blank line.

use regex::Regex;
use std::sync::OnceLock;

/// Scanning stops after this much banner text; a CLI that never matches
/// would otherwise grow the scan buffer for the whole session.
const SCAN_LIMIT: usize = 64 * 1024;

fn ansi() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*[mGKJH]").expect("invalid regex"))
}

fn greeting() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)You are chatting with .+").expect("invalid regex"))
}

fn separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // 10+ heavy/light box-drawing chars, then a blank line anywhere later.
    RE.get_or_init(|| Regex::new(r"(?s)[━─]{10,}.*?\n[ \t]*\n").expect("invalid regex"))
}

/// Accumulates startup output and reports readiness exactly once.
#[derive(Debug, Default)]
pub struct InitDetector {
    buf: String,
    done: bool,
}

impl InitDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of session output. Returns true exactly once, on the
    /// chunk that completes a match; afterwards the detector is inert.
    pub fn feed(&mut self, chunk: &str) -> bool {
        if self.done {
            return false;
        }

        self.buf.push_str(chunk);
        let plain = ansi().replace_all(&self.buf, "");

        if greeting().is_match(&plain) || separator().is_match(&plain) {
            self.done = true;
            self.buf = String::new();
            return true;
        }

        if self.buf.len() > SCAN_LIMIT {
            self.done = true;
            self.buf = String::new();
        }
        false
    }

    /// Whether scanning has finished (matched or given up).
    pub fn is_done(&self) -> bool {
        self.done
    }
}
