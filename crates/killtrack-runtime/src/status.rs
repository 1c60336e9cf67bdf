//! Tracker status reported once per cycle and on lifecycle changes.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Started, no cycle has completed yet.
    Ready,
    Running { via: String, poll_ms: u64 },
    /// The chat source could not be read this cycle; retried next cycle.
    SourceUnavailable(String),
    Stopped,
    Cleared,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("ready"),
            Self::Running { via, poll_ms } => write!(f, "running (poll {poll_ms}ms) via {via}"),
            Self::SourceUnavailable(note) => write!(f, "chat source unavailable: {note}"),
            Self::Stopped => f.write_str("stopped"),
            Self::Cleared => f.write_str("cleared all stored data"),
        }
    }
}
