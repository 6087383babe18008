//! Qube stream processing - turns raw PTY output into clean scrollback
//!
//! The Q CLI writes a noisy byte stream: ANSI styling, carriage-return
//! driven spinners, "Thinking..." animations, and echoes of what the user
//! just typed. This crate provides the incremental parser that splits that
//! stream into finalized history lines plus a single live progress line.

pub mod patterns;
pub mod processor;

pub use processor::{ProcessUpdate, ProgressUpdate, StreamProcessor};
