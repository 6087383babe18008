//! Error types for command dispatch

use thiserror::Error;

/// Errors from executing a submission.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Sending into the live session failed
    #[error("failed to send command to session: {0}")]
    SessionSend(#[source] anyhow::Error),

    /// Opening the interactive session failed
    #[error("failed to start session: {0}")]
    SessionStart(#[source] anyhow::Error),

    /// The short-lived command failed to run
    #[error("command execution failed: {0}")]
    Command(#[source] anyhow::Error),

    /// The short-lived command ran but exited non-zero
    #[error("command exited with status {0}")]
    ExitStatus(i32),
}
