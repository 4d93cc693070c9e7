//! Session lifecycle states

use serde::{Deserialize, Serialize};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SessionState {
    /// Shell spawned, bootstrap not yet written
    #[default]
    Uninitialized,
    /// Bootstrap written, waiting for the first prompt
    Starting,
    /// Accepting commands
    Ready,
    /// Startup timed out or reported an error
    Failed,
    /// Shut down explicitly or the shell went away
    Closed,
}

impl SessionState {
    /// Whether `exec` is accepted
    pub fn accepts_commands(&self) -> bool {
        matches!(self, SessionState::Ready)
    }

    /// Whether the session can never become ready again
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Failed | SessionState::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Starting => "starting",
            SessionState::Ready => "ready",
            SessionState::Failed => "failed",
            SessionState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
