//! Shell Process Model
//!
//! Tracks the lifecycle of the spawned shell executable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents the state of the shell process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProcessState {
    /// Process has been created but not started
    #[default]
    Created,
    /// Process is currently running
    Running,
    /// Process has terminated
    Terminated,
}

/// The shell executable backing a session
#[derive(Debug, Clone)]
pub struct ShellProcess {
    /// Executable name the shell was spawned from
    pub shell: String,

    /// Arguments passed to the shell
    pub args: Vec<String>,

    /// OS process identifier
    pub pid: Option<u32>,

    /// Current state of the process
    pub state: ProcessState,

    /// When the process was started
    pub start_time: Option<DateTime<Utc>>,

    /// When the process terminated (if applicable)
    pub end_time: Option<DateTime<Utc>>,

    /// Exit code (if process has terminated)
    pub exit_code: Option<i32>,
}

impl ShellProcess {
    /// Create a new shell process in the Created state
    pub fn new(shell: String, args: Vec<String>) -> Self {
        Self {
            shell,
            args,
            pid: None,
            state: ProcessState::Created,
            start_time: None,
            end_time: None,
            exit_code: None,
        }
    }

    /// Mark the process as started with the given PID
    pub fn mark_started(&mut self, pid: Option<u32>) {
        self.pid = pid;
        self.state = ProcessState::Running;
        self.start_time = Some(Utc::now());
    }

    /// Mark the process as terminated with the given exit code
    pub fn mark_terminated(&mut self, exit_code: Option<i32>) {
        self.state = ProcessState::Terminated;
        self.end_time = Some(Utc::now());
        self.exit_code = exit_code;
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, ProcessState::Running)
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.state, ProcessState::Terminated)
    }

    /// How long the process ran, once it has terminated
    pub fn execution_duration(&self) -> Option<std::time::Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end.signed_duration_since(start).to_std().unwrap_or_default()),
            _ => None,
        }
    }
}

impl std::fmt::Display for ShellProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pid = self.pid.map_or("N/A".to_string(), |pid| pid.to_string());
        write!(f, "{} [{}] - {:?}", self.shell, pid, self.state)?;
        if let Some(code) = self.exit_code {
            write!(f, " (exit: {})", code)?;
        }
        Ok(())
    }
}
