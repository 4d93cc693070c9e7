//! Command Executor
//!
//! Cheap, clonable handle that submits commands to a running session. Library
//! proxies and the binary both go through it.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use super::driver::Control;
use crate::error::{Error, Result};
use crate::models::{CommandOutput, ExecRequest, PendingCommand, SessionState};

/// Submits commands to the session driver
#[derive(Debug, Clone)]
pub struct Executor {
    control_tx: mpsc::UnboundedSender<Control>,
    state_rx: watch::Receiver<SessionState>,
    default_timeout: Duration,
}

impl Executor {
    pub(crate) fn new(
        control_tx: mpsc::UnboundedSender<Control>,
        state_rx: watch::Receiver<SessionState>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            control_tx,
            state_rx,
            default_timeout,
        }
    }

    /// Current session lifecycle state
    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// Deadline applied to requests that do not set their own
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Execute a command
    ///
    /// The request is queued before this returns, so commands run in the
    /// order `exec` was called even if the futures are polled out of order.
    pub fn exec(&self, request: impl Into<ExecRequest>) -> BoxFuture<'static, Result<CommandOutput>> {
        let request = request.into();

        if !self.state().accepts_commands() {
            return futures::future::ready(Err(Error::NotStarted)).boxed();
        }

        let (pending, completion) = PendingCommand::new(request.command.clone());
        let id = pending.id;
        if self.control_tx.send(Control::Exec(pending)).is_err() {
            return futures::future::ready(Err(Error::SessionClosed)).boxed();
        }
        trace!(%id, "Submitted command");

        // The clock starts at submission, not at the first poll
        let deadline = request
            .effective_timeout(self.default_timeout)
            .map(|limit| (limit, Instant::now() + limit));
        async move {
            let outcome = match deadline {
                Some((limit, at)) => match tokio::time::timeout_at(at, completion).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(%id, "Command timed out after {:?}", limit);
                        if request.safe_timeout {
                            return Ok(CommandOutput::timed_out());
                        }
                        return Err(Error::Timeout {
                            command: request.command,
                            duration: limit,
                        });
                    }
                },
                None => completion.await,
            };

            // A dropped responder means the driver went away
            let value = outcome.map_err(|_| Error::SessionClosed)??;
            Ok(CommandOutput::new(value))
        }
        .boxed()
    }
}
