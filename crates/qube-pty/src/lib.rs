//! Qube PTY - the long-lived interactive Q session
//!
//! Owns the pseudo-terminal attached to the Q CLI: spawning with a forced
//! terminal identity and window size, streaming output in read order,
//! detecting when the CLI has finished initializing, and tearing the child
//! down with a TERM-then-KILL escalation.

pub mod error;
pub mod events;
pub mod init;
pub mod session;

pub use error::SessionError;
pub use events::SessionEvent;
pub use init::InitDetector;
pub use session::{Session, SessionConfig, PTY_COLS, PTY_ROWS};
