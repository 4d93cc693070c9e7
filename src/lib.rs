//! pwsh-bridge - drive a long-lived PowerShell session as an async API
//!
//! One shell process, many callers: commands are queued, written to the
//! shell one at a time, and their output is split back into structured
//! results or classified errors.
//!
//! ## Features
//!
//! - **Serialized execution:** FIFO queue with exactly one command in flight
//! - **Structured results:** values come back as JSON, errors as typed records
//! - **Timeouts:** per-call deadlines with an optional non-failing mode
//! - **Native bindings:** declare native library members, call them through proxies
//! - **Extensions:** attach reusable bundles of library imports
//!
//! ## Module Organization
//!
//! - [`session`] - Session manager, command queue, output demultiplexer
//! - [`protocol`] - Wire tokens, bootstrap script, result/error decoding
//! - [`ffi`] - `Add-Type` generation and library proxies
//! - [`shell`] - Shell discovery, spawning and stdio bridging
//! - [`config`] - Configuration structures and file loading
//! - [`models`] - Requests, outputs and lifecycle states
//! - [`extension`] - Session extensions
//! - [`mod@error`] - Error types and Result aliases
//!
//! ## Quick Start
//!
//! ```no_run
//! use pwsh_bridge::{Session, SessionConfig};
//!
//! # async fn run() -> pwsh_bridge::Result<()> {
//! let session = Session::launch(SessionConfig::default()).await?;
//!
//! let sum = session.exec("1 + 1").await?;
//! assert_eq!(sum.value, 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **Driver task:** owns the queue and the demultiplexer, sole writer to stdin
//! - **Reader tasks:** forward stdout and stderr chunks to the driver
//! - **Writer task:** drains the input channel into the shell's stdin
//!
//! Callers talk to the driver through `tokio::mpsc` and observe the session
//! lifecycle through `tokio::sync::watch`.

#![allow(unexpected_cfgs)]

#[macro_use]
extern crate tracing;

pub mod config;
pub mod error;
pub mod extension;
pub mod ffi;
pub mod models;
pub mod protocol;
pub mod session;
pub mod shell;

// Re-exports for core functionality
pub use config::loader::ConfigLoader;
pub use config::{SessionConfig, TimeoutConfig};
pub use error::{Error, Result};
pub use extension::Extension;
pub use ffi::{LibraryProxy, ShellArg, Signature};
pub use models::{CommandOutput, ExecRequest, SessionState};
pub use protocol::{ErrorClass, ErrorRecord};
pub use session::{Executor, Session};

/// The current version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The package name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// The package description from Cargo.toml
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Load configuration from an explicit file or the default locations
///
/// Without a path, a missing or unreadable configuration falls back to
/// defaults. An explicit path must load.
pub fn load_config(path: Option<&std::path::Path>) -> Result<SessionConfig> {
    match path {
        Some(path) => {
            let config = ConfigLoader::load_from_path(path)?;
            info!("Configuration loaded from {}", path.display());
            Ok(config)
        }
        None => match ConfigLoader::load() {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("Failed to load configuration: {}. Using defaults", e);
                Ok(SessionConfig::default())
            }
        },
    }
}

/// Human-readable report for errors that stop a session from starting
pub fn handle_startup_error(error: &Error) -> String {
    match error {
        Error::ShellNotFound { tried } => {
            format!(
                "Shell Error: no PowerShell executable could be started (tried {})\n\nTry:\n• Install PowerShell 7 (pwsh)\n• Pass the executable with --shell",
                tried.join(", ")
            )
        }
        Error::StartupTimeout { after } => {
            format!(
                "Startup Error: the shell did not become ready within {:?}\n\nTry:\n• Raise timeouts.startup_ms\n• Check that the shell starts without prompting",
                after
            )
        }
        Error::StartupFailed { stderr } => {
            format!(
                "Startup Error: the shell reported errors while loading:\n{}\n\nTry:\n• Check library paths and signatures",
                stderr.trim()
            )
        }
        Error::ConfigLoadFailed { path, reason } => {
            format!(
                "Configuration Error: Failed to load config from '{}': {}",
                path.display(),
                reason
            )
        }
        Error::ConfigParseFailed { format, reason } => {
            format!("Configuration Error: Failed to parse {} config: {}", format, reason)
        }
        Error::ConfigValidationFailed { field, reason } => {
            format!(
                "Configuration Error: Validation failed for '{}': {}",
                field, reason
            )
        }
        _ => format!("Unexpected Error: {}", error),
    }
}
