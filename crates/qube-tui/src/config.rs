//! Runtime configuration
//!
//! Built once at startup from CLI flags and the environment; everything
//! downstream receives plain values.

use std::path::PathBuf;

/// Environment variable naming the log destination.
pub const LOG_ENV: &str = "QUBE_LOG";

#[derive(Debug, Clone)]
pub struct Config {
    /// Override for the Q binary (exported as `Q_BIN` for discovery).
    pub q_bin: Option<String>,
    /// Start a `q chat` session automatically on launch.
    pub auto_chat: bool,
    /// Log file; logging is disabled when unset (stderr would corrupt
    /// the TUI).
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            q_bin: None,
            auto_chat: true,
            log_file: std::env::var_os(LOG_ENV).map(PathBuf::from),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_q_bin(mut self, q_bin: impl Into<String>) -> Self {
        self.q_bin = Some(q_bin.into());
        self
    }

    pub fn with_auto_chat(mut self, auto_chat: bool) -> Self {
        self.auto_chat = auto_chat;
        self
    }

    pub fn with_log_file(mut self, log_file: impl Into<PathBuf>) -> Self {
        self.log_file = Some(log_file.into());
        self
    }
}
