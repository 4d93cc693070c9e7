//! Shell subprocess management
//!
//! Discovery, spawning, stdio bridging and termination of the shell that
//! backs a session.

pub mod process;
pub mod signals;
pub mod streams;

// Re-exports for convenience
pub use process::{candidate_shells, discover_shell, spawn_shell, SpawnConfig, SpawnedShell, FALLBACK_SHELLS};
pub use signals::send_terminate;
pub use streams::{ShellStreams, StreamChunk, Utf8Decoder};
