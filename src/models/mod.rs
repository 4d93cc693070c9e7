//! Core data models for pwsh-bridge
//!
//! Requests, outputs, the shell process record and the session lifecycle.

pub mod command_output;
pub mod command_request;
pub mod session_state;
pub mod shell_process;

// Re-exports for convenience
pub use command_output::CommandOutput;
pub use command_request::{ExecRequest, PendingCommand};
pub use session_state::SessionState;
pub use shell_process::{ProcessState, ShellProcess};
