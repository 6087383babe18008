//! Session events
//!
//! Delivered over an unbounded channel injected at construction. Ordering
//! follows the reader thread's read order; `Initialized` and `Exited` are
//! emitted at most once per started session.

/// Events emitted by a PTY session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Bytes read from the PTY. Each event owns its buffer; successive
    /// events never share backing storage.
    Output(Vec<u8>),
    /// The CLI finished rendering its startup banner.
    Initialized,
    /// The child exited with this code (-1 when unknown).
    Exited(i32),
    /// A read or wait failure mid-session.
    Error(String),
}

impl SessionEvent {
    /// Whether this event ends the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exited(_))
    }
}
