//! Error types for command execution and binary discovery

use std::time::Duration;
use thiserror::Error;

/// Errors from running a short-lived command.
#[derive(Debug, Error)]
pub enum ExecError {
    /// `run` was called with an empty argument list
    #[error("no command provided")]
    NoCommand,

    /// The child process failed to start
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The child exceeded its deadline and was killed
    #[error("command timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// IO error while draining output or waiting for exit
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from Q CLI binary discovery.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DetectError {
    /// `Q_BIN` is set but does not name an executable
    #[error("Q_BIN is set but does not resolve to an executable")]
    OverrideNotFound,

    /// No candidate binary was found on PATH
    #[error("Amazon Q CLI not found; set Q_BIN or install amazonq")]
    NotFound,
}

/// Result type alias for command execution.
pub type Result<T> = std::result::Result<T, ExecError>;
