//! Qube process - short-lived command execution
//!
//! Runs a Q subcommand to completion with a hard deadline, capturing
//! combined stdout+stderr, and resolves the Q CLI binary on this machine.

pub mod detect;
pub mod error;
pub mod runner;

pub use detect::detect_q_cli;
pub use error::{DetectError, ExecError, Result};
pub use runner::{run, CommandOutput, DEFAULT_TIMEOUT};
