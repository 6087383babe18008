//! Error types for PTY session operations

use qube_process::DetectError;
use thiserror::Error;

/// Errors that can occur during session lifecycle operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The Q CLI binary could not be located
    #[error(transparent)]
    Detect(#[from] DetectError),

    /// PTY allocation failed
    #[error("failed to create PTY: {0}")]
    Create(#[source] anyhow::Error),

    /// The child failed to spawn on the PTY
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: anyhow::Error,
    },

    /// The PTY reader handle could not be cloned
    #[error("failed to clone reader: {0}")]
    CloneReader(#[source] anyhow::Error),

    /// The PTY writer handle could not be taken
    #[error("failed to get writer: {0}")]
    Writer(#[source] anyhow::Error),

    /// `send` was called before `start`
    #[error("session not started")]
    NotStarted,

    /// `start` was called while a session is live
    #[error("session already running")]
    AlreadyRunning,

    /// IO error writing to or closing the PTY
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
