//! The core-to-UI event contract and terminal input forwarding

use std::thread;

use qube_executor::{Mode, Status};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::debug;

/// Events the core posts to the UI queue. Sends are non-blocking and
/// per-producer ordering is preserved by the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Append a finalized line to scrollback.
    AppendOutput(String),
    /// Update the single live progress indicator.
    SetProgress(String),
    /// Remove the progress indicator.
    ClearProgress,
    /// Executor status for the status bar.
    SetStatus(Status),
    /// Executor mode for the status bar.
    SetMode(Mode),
    /// Enable or disable the prompt.
    SetInputEnabled(bool),
    /// Session initialization state for the header.
    SetConnected(bool),
    /// Bump the error counter in the status bar.
    IncrementError,
    /// Drop scrollback and the progress line.
    ClearScreen,
}

/// Read crossterm events on a dedicated thread and forward them over a
/// channel, so the UI loop can select over input and core events alike.
pub fn spawn_input_thread() -> UnboundedReceiver<crossterm::event::Event> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::spawn(move || {
        loop {
            match crossterm::event::read() {
                Ok(event) => {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    debug!(error = %err, "terminal event read failed");
                    break;
                }
            }
        }
    });
    rx
}
