//! Qube TUI - the terminal front-end for the Q CLI
//!
//! The UI runs a single-threaded cooperative loop; the core posts typed
//! events onto an unbounded queue and never calls back into the UI
//! directly. Submissions travel the other way through a single dispatch
//! path that runs the executor off the UI loop.

pub mod app;
pub mod assembly;
pub mod config;
pub mod event;
pub mod history;
pub mod view;

pub use app::{Action, App};
pub use assembly::{build_core, Core};
pub use config::Config;
pub use event::AppEvent;
pub use history::CommandHistory;
