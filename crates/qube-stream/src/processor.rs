//! The incremental stream-to-history parser
//!
//! `StreamProcessor` consumes raw chunks from the PTY in arbitrary splits
//! and produces finalized scrollback lines plus a single live progress
//! line. It performs no I/O and is not internally synchronized; the
//! assembly owns it behind a mutex and feeds it from one reader at a time.

use crate::patterns;

/// Display text used for the thinking animation.
const THINKING_LABEL: &str = "Thinking...";

/// Net progress-line change produced by one `process_data` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressUpdate {
    /// The progress line did not change during this chunk.
    Unchanged,
    /// The progress line is now this text.
    Set(String),
    /// The progress line was cleared.
    Cleared,
}

/// Output of one `process_data` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessUpdate {
    /// Lines finalized by this chunk, in display order. A promoted
    /// progress line precedes the content lines that finalized it.
    pub lines: Vec<String>,
    /// Net change to the live progress line.
    pub progress: ProgressUpdate,
}

impl ProcessUpdate {
    fn unchanged() -> Self {
        Self {
            lines: Vec::new(),
            progress: ProgressUpdate::Unchanged,
        }
    }
}

/// Incremental parser state.
///
/// Invariants:
/// - at most one progress line is active at any time;
/// - the thinking state is never promoted into scrollback;
/// - echo suppression consumes at most one line per recorded command.
#[derive(Debug, Default)]
pub struct StreamProcessor {
    /// Accumulated text not yet terminated by a newline.
    buffer: String,
    /// The live progress line, if any.
    progress: Option<String>,
    /// Whether the current progress line is the thinking animation.
    thinking: bool,
    /// Trimmed text of the most recently sent command, consumed once.
    last_sent: Option<String>,
}

impl StreamProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one chunk of PTY output.
    ///
    /// CRLF is normalized to LF up front (ANSI bytes are preserved). A
    /// carriage return means "return to column 0 and overwrite", so when a
    /// chunk carries CRs only the text after the last one survives; the
    /// last non-empty CR segment is classified as a potential progress
    /// line first. Newlines finalize lines into scrollback, promoting a
    /// pending non-thinking progress line exactly once.
    pub fn process_data(&mut self, data: &str) -> ProcessUpdate {
        if self.buffer.is_empty() && data.is_empty() {
            return ProcessUpdate::unchanged();
        }

        let mut merged = format!("{}{}", self.buffer, data).replace("\r\n", "\n");
        let mut progress_dirty = false;

        if merged.contains('\r') {
            // The segment still visible after all the overwrites. A chunk
            // ending in CR leaves the previous segment on screen with the
            // cursor at column 0, so classification looks at the last
            // non-empty segment while the working text becomes empty.
            let segments: Vec<&str> = merged.split('\r').collect();
            let visible = segments
                .iter()
                .rev()
                .find(|s| !s.is_empty())
                .copied()
                .unwrap_or_default();

            if patterns::thinking().is_match(visible) {
                self.thinking = true;
                self.progress = Some(THINKING_LABEL.to_string());
                progress_dirty = true;
            } else if patterns::is_progress(visible) {
                self.thinking = false;
                self.progress = Some(visible.trim().to_string());
                progress_dirty = true;
            }

            merged = segments.last().copied().unwrap_or_default().to_string();
        }

        let mut segments: Vec<&str> = merged.split('\n').collect();
        let incomplete = segments.pop().unwrap_or_default().to_string();

        let mut lines = Vec::new();

        // A newline arrived while a progress line was showing: archive it
        // once. The thinking animation is display-only and never archived.
        if !segments.is_empty() && !self.thinking {
            if let Some(promoted) = self.progress.take() {
                lines.push(promoted);
                progress_dirty = true;
            }
        }

        for line in &segments {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if patterns::thinking().is_match(trimmed) {
                self.thinking = true;
                self.progress = Some(THINKING_LABEL.to_string());
                progress_dirty = true;
                continue;
            }

            // Real content ends the thinking display.
            if self.thinking {
                self.thinking = false;
                self.progress = None;
                progress_dirty = true;
            }

            if self.last_sent.as_deref() == Some(trimmed) {
                self.last_sent = None;
                continue;
            }

            lines.push((*line).to_string());
        }

        self.buffer = incomplete;

        let progress = if progress_dirty {
            match &self.progress {
                Some(text) => ProgressUpdate::Set(text.clone()),
                None => ProgressUpdate::Cleared,
            }
        } else {
            ProgressUpdate::Unchanged
        };

        ProcessUpdate { lines, progress }
    }

    /// Record the command the user just submitted; the next finalized line
    /// equal to it (after trimming) is dropped as terminal echo.
    pub fn set_last_sent_command(&mut self, command: &str) {
        self.last_sent = Some(command.trim().to_string());
    }

    /// The current live progress line, if any.
    pub fn current_progress(&self) -> Option<&str> {
        self.progress.as_deref()
    }

    /// Reset buffer, progress, thinking state, and echo suppression.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.progress = None;
        self.thinking = false;
        self.last_sent = None;
    }
}
