//! Configuration for pwsh-bridge sessions
//!
//! Which shells to try, how to start them, timeouts, and native libraries to
//! import before startup. Loadable from TOML or JSON through [`loader`].

pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::ffi::LibraryImports;

/// Default wait for the first prompt
pub const DEFAULT_STARTUP_TIMEOUT_MS: u64 = 8_000;

/// Default per-command deadline
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 20_000;

/// Default wait for the shell to exit on its own during shutdown
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 2_000;

/// Session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Shells to try before `pwsh` and `powershell`
    pub additional_shells: Vec<String>,

    /// Arguments passed to the shell executable
    pub shell_args: Vec<String>,

    /// Working directory for the shell
    pub working_directory: Option<PathBuf>,

    /// Start the session as soon as it is launched
    pub auto_start: bool,

    /// Timeouts
    pub timeouts: TimeoutConfig,

    /// Native libraries to import: path -> member -> declaration
    pub libraries: LibraryImports,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            additional_shells: Vec::new(),
            shell_args: vec!["-NoLogo".to_string(), "-NoProfile".to_string()],
            working_directory: None,
            auto_start: true,
            timeouts: TimeoutConfig::default(),
            libraries: LibraryImports::new(),
        }
    }
}

impl SessionConfig {
    /// Try this shell before the others
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.additional_shells.push(shell.into());
        self
    }

    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }
}

/// Timeouts, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Wait for the first prompt after the bootstrap is written
    pub startup_ms: u64,

    /// Default per-command deadline (0 disables it)
    pub command_ms: u64,

    /// Wait for the shell to exit before terminating it
    pub shutdown_grace_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            startup_ms: DEFAULT_STARTUP_TIMEOUT_MS,
            command_ms: DEFAULT_COMMAND_TIMEOUT_MS,
            shutdown_grace_ms: DEFAULT_SHUTDOWN_GRACE_MS,
        }
    }
}

impl TimeoutConfig {
    pub fn startup(&self) -> Duration {
        Duration::from_millis(self.startup_ms)
    }

    pub fn command(&self) -> Duration {
        Duration::from_millis(self.command_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}
