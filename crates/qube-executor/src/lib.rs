//! Qube executor - the dispatch state machine
//!
//! Decides, per user submission, whether to open an interactive session,
//! send into the one already running, or run a short-lived command, and
//! reports status/mode/output/error through an event channel.

pub mod error;
pub mod executor;

pub use error::ExecutorError;
pub use executor::{
    CommandExecutor, CommandRunner, ExecutorEvent, Mode, Session, Status,
};
