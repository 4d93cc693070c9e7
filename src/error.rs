//! Error types and Result aliases for pwsh-bridge

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::protocol::ErrorRecord;

/// Result type alias for pwsh-bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pwsh-bridge
#[derive(Debug)]
pub enum Error {
    // === Shell process errors ===
    /// None of the candidate shells could be spawned
    ShellNotFound {
        tried: Vec<String>,
    },

    /// Failed to spawn a shell executable
    ShellSpawnFailed {
        shell: String,
        reason: String,
    },

    /// Failed to hand input to the shell writer
    InputSendFailed {
        reason: String,
    },

    /// Failed to send a signal to the shell process
    SignalSendFailed {
        signal: String,
        reason: String,
    },

    // === Session lifecycle errors ===
    /// `start` was called on a session that was already started
    AlreadyStarted,

    /// The session has not completed startup
    NotStarted,

    /// The shell did not reach its first prompt in time
    StartupTimeout {
        after: Duration,
    },

    /// The shell wrote to stderr before its first prompt
    StartupFailed {
        stderr: String,
    },

    /// The session was shut down or its driver stopped
    SessionClosed,

    // === Command errors ===
    /// The shell reported the command as syntactically incomplete
    IncompleteCommand {
        command: String,
    },

    /// Per-call deadline exceeded
    Timeout {
        command: String,
        duration: Duration,
    },

    /// The shell surfaced a structured error
    Execution(ErrorRecord),

    // === Binding errors ===
    /// `import_dll` was called after `start`
    ImportAfterStart {
        path: String,
    },

    /// The path does not name a native library
    InvalidLibraryPath {
        path: String,
    },

    /// A declarative signature could not be converted
    InvalidSignature {
        member: String,
        reason: String,
    },

    /// No imported library with this name
    UnknownLibrary {
        library: String,
    },

    /// No member with this name in the library
    UnknownMember {
        library: String,
        member: String,
    },

    /// A field was called or a method was read/assigned
    MemberKindMismatch {
        library: String,
        member: String,
        expected: &'static str,
    },

    // === Configuration errors ===
    /// Failed to load configuration file
    ConfigLoadFailed {
        path: PathBuf,
        reason: String,
    },

    /// Configuration file not found
    ConfigNotFound,

    /// Configuration validation failed
    ConfigValidationFailed {
        field: String,
        reason: String,
    },

    /// Failed to parse configuration
    ConfigParseFailed {
        format: String,
        reason: String,
    },

    // === I/O and serialization errors ===
    /// I/O errors
    Io(std::io::Error),

    /// Serialization errors
    Serde(serde_json::Error),

    /// TOML parsing errors
    Toml(toml::de::Error),

    // === Generic fallback (use sparingly) ===
    /// Generic errors
    Other(String),
}

impl Error {
    /// Whether this error leaves the session unusable
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::StartupTimeout { .. } | Error::StartupFailed { .. } | Error::SessionClosed
        )
    }

    /// The structured shell error, if this is one
    pub fn as_record(&self) -> Option<&ErrorRecord> {
        match self {
            Error::Execution(record) => Some(record),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Shell process errors
            Error::ShellNotFound { tried } => {
                write!(
                    f,
                    "Cannot find a PowerShell interpreter (tried: {}). Install PowerShell or add your own",
                    tried.join(", ")
                )
            }
            Error::ShellSpawnFailed { shell, reason } => {
                write!(f, "Failed to spawn shell '{}': {}", shell, reason)
            }
            Error::InputSendFailed { reason } => {
                write!(f, "Failed to send input to shell: {}", reason)
            }
            Error::SignalSendFailed { signal, reason } => {
                write!(f, "Failed to send signal '{}': {}", signal, reason)
            }

            // Session lifecycle errors
            Error::AlreadyStarted => write!(f, "Cannot start twice"),
            Error::NotStarted => write!(f, "The shell isn't initiated yet"),
            Error::StartupTimeout { after } => {
                write!(f, "Shell took too long to start (waited {:?})", after)
            }
            Error::StartupFailed { stderr } => {
                write!(f, "Shell initialisation reported an error: {}", stderr.trim())
            }
            Error::SessionClosed => write!(f, "Shell session is closed"),

            // Command errors
            Error::IncompleteCommand { command } => {
                write!(
                    f,
                    "Command '{}' is incomplete. Verify that you have closed quotes and blocks",
                    command
                )
            }
            Error::Timeout { command, duration } => {
                write!(f, "Command '{}' exceeded the timeout of {:?}", command, duration)
            }
            Error::Execution(record) => write!(f, "{}", record),

            // Binding errors
            Error::ImportAfterStart { path } => {
                write!(f, "Cannot import '{}' after starting", path)
            }
            Error::InvalidLibraryPath { path } => {
                write!(
                    f,
                    "Library path '{}' should end with .dll, .so or .dylib",
                    path
                )
            }
            Error::InvalidSignature { member, reason } => {
                write!(f, "Invalid signature for '{}': {}", member, reason)
            }
            Error::UnknownLibrary { library } => {
                write!(f, "Library '{}' was not imported", library)
            }
            Error::UnknownMember { library, member } => {
                write!(f, "Library '{}' has no member '{}'", library, member)
            }
            Error::MemberKindMismatch {
                library,
                member,
                expected,
            } => {
                write!(f, "Member '{}.{}' is not a {}", library, member, expected)
            }

            // Configuration errors
            Error::ConfigLoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path.display(), reason)
            }
            Error::ConfigNotFound => write!(f, "Configuration file not found"),
            Error::ConfigValidationFailed { field, reason } => {
                write!(f, "Configuration validation failed for '{}': {}", field, reason)
            }
            Error::ConfigParseFailed { format, reason } => {
                write!(f, "Failed to parse {} config: {}", format, reason)
            }

            // I/O and serialization errors
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Serde(err) => write!(f, "Serialization error: {}", err),
            Error::Toml(err) => write!(f, "TOML parsing error: {}", err),

            // Generic fallback
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Serde(err) => Some(err),
            Error::Toml(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err)
    }
}

impl From<ErrorRecord> for Error {
    fn from(record: ErrorRecord) -> Self {
        Error::Execution(record)
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}
