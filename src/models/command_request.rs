//! Command Request Model
//!
//! A unit of work submitted through `exec`. The public [`ExecRequest`] is
//! what callers build; [`PendingCommand`] is the queue entry the driver owns.

use chrono::{DateTime, Local};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::Result;

/// A command submitted to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    /// Command text, executed in an isolated script-block scope
    pub command: String,
    /// Per-call deadline; `None` uses the session default, zero disables it
    pub timeout: Option<Duration>,
    /// Resolve with a timed-out marker instead of failing
    pub safe_timeout: bool,
}

impl ExecRequest {
    /// A request with the session's default timeout
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: None,
            safe_timeout: false,
        }
    }

    /// Set the per-call deadline (zero disables it)
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Resolve with `timeout: true` instead of failing when the deadline passes
    pub fn safe_timeout(mut self, safe: bool) -> Self {
        self.safe_timeout = safe;
        self
    }

    /// The deadline that applies given the session default
    pub fn effective_timeout(&self, default: Duration) -> Option<Duration> {
        let timeout = self.timeout.unwrap_or(default);
        if timeout.is_zero() {
            None
        } else {
            Some(timeout)
        }
    }
}

impl From<&str> for ExecRequest {
    fn from(command: &str) -> Self {
        Self::new(command)
    }
}

impl From<String> for ExecRequest {
    fn from(command: String) -> Self {
        Self::new(command)
    }
}

impl From<&String> for ExecRequest {
    fn from(command: &String) -> Self {
        Self::new(command.clone())
    }
}

/// Sender half used to complete a pending command
pub type Responder = oneshot::Sender<Result<Value>>;

/// Queue entry owned by the session driver
#[derive(Debug)]
pub struct PendingCommand {
    /// Identifier used in logs
    pub id: Uuid,
    /// Command text
    pub command: String,
    /// Whether the command was written to the shell
    pub dispatched: bool,
    /// When the command was enqueued
    pub enqueued_at: DateTime<Local>,
    responder: Option<Responder>,
}

impl PendingCommand {
    /// Create a new pending command and the receiver for its completion
    pub fn new(command: impl Into<String>) -> (Self, oneshot::Receiver<Result<Value>>) {
        let (tx, rx) = oneshot::channel();
        let pending = Self {
            id: Uuid::new_v4(),
            command: command.into(),
            dispatched: false,
            enqueued_at: Local::now(),
            responder: Some(tx),
        };
        (pending, rx)
    }

    /// Mark the command as written to the shell
    pub fn mark_dispatched(&mut self) {
        self.dispatched = true;
    }

    /// Whether the caller is still waiting for the result
    ///
    /// False once the caller gave up, e.g. after a timeout.
    pub fn has_waiter(&self) -> bool {
        self.responder
            .as_ref()
            .map(|tx| !tx.is_closed())
            .unwrap_or(false)
    }

    /// Deliver the outcome; returns false if nobody was listening
    pub fn complete(mut self, outcome: Result<Value>) -> bool {
        match self.responder.take() {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }
}
