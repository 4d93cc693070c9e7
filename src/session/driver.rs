//! Session driver
//!
//! The one task that owns the queue, the demultiplexer and the busy flag.
//! It is the only writer to the shell's stdin. Every incoming message (a new
//! request, an output chunk, the startup deadline) is handled and followed by
//! a dispatch attempt, so a queued command is written as soon as the shell is
//! idle without polling.

use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};

use super::demux::{DemuxEvent, OutputDemux};
use super::queue::CommandQueue;
use crate::error::{Error, Result};
use crate::models::{PendingCommand, SessionState};
use crate::protocol::{classify, wrap_command, ErrorTypeTable, INTERRUPT};
use crate::shell::{ShellStreams, StreamChunk};

/// Messages from session handles to the driver
#[derive(Debug)]
pub(crate) enum Control {
    /// Enqueue a command
    Exec(PendingCommand),
    /// Write the bootstrap and wait for the first prompt
    Start {
        script: String,
        timeout: Duration,
        ready: oneshot::Sender<Result<()>>,
    },
    /// Ask the shell to exit and stop driving
    Shutdown { done: oneshot::Sender<()> },
}

enum Event {
    Control(Option<Control>),
    Output(Option<StreamChunk>),
    StartupDeadline,
}

pub(crate) struct Driver {
    streams: ShellStreams,
    control_rx: mpsc::UnboundedReceiver<Control>,
    state_tx: watch::Sender<SessionState>,
    error_table: Arc<RwLock<ErrorTypeTable>>,
    queue: CommandQueue,
    demux: OutputDemux,
    busy: bool,
    startup_deadline: Option<Instant>,
    startup_timeout: Duration,
    ready: Option<oneshot::Sender<Result<()>>>,
    shutdown_done: Option<oneshot::Sender<()>>,
}

impl Driver {
    pub(crate) fn new(
        streams: ShellStreams,
        control_rx: mpsc::UnboundedReceiver<Control>,
        state_tx: watch::Sender<SessionState>,
        error_table: Arc<RwLock<ErrorTypeTable>>,
    ) -> Self {
        Self {
            streams,
            control_rx,
            state_tx,
            error_table,
            queue: CommandQueue::new(),
            demux: OutputDemux::new(),
            // Busy until the shell shows its first prompt
            busy: true,
            startup_deadline: None,
            startup_timeout: Duration::ZERO,
            ready: None,
            shutdown_done: None,
        }
    }

    /// Drive the session until shutdown or until the shell goes away
    pub(crate) async fn run(mut self) {
        loop {
            let event = tokio::select! {
                msg = self.control_rx.recv() => Event::Control(msg),
                chunk = self.streams.recv() => Event::Output(chunk),
                _ = wait_for(self.startup_deadline) => Event::StartupDeadline,
            };

            let keep_running = match event {
                Event::Control(Some(control)) => self.handle_control(control),
                Event::Control(None) => {
                    debug!("All session handles dropped, stopping driver");
                    false
                }
                Event::Output(Some(chunk)) => {
                    self.handle_chunk(chunk);
                    true
                }
                Event::Output(None) => {
                    warn!("Shell output closed");
                    false
                }
                Event::StartupDeadline => {
                    self.handle_startup_timeout();
                    true
                }
            };

            if !keep_running {
                break;
            }
            self.dispatch_next();
        }

        self.close();
        if let Some(done) = self.shutdown_done.take() {
            let _ = done.send(());
        }
    }

    fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: SessionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            info!("Session state {} -> {}", previous, state);
        }
    }

    fn handle_control(&mut self, control: Control) -> bool {
        match control {
            Control::Exec(pending) => {
                if !self.state().accepts_commands() {
                    pending.complete(Err(Error::NotStarted));
                    return true;
                }
                debug!(id = %pending.id, "Queued command: {}", pending.command);
                self.queue.push(pending);
                true
            }
            Control::Start {
                script,
                timeout,
                ready,
            } => {
                if self.state() != SessionState::Uninitialized {
                    let _ = ready.send(Err(Error::AlreadyStarted));
                    return true;
                }
                // Output seen so far belongs to the banner
                self.demux.reset();
                self.busy = true;
                if let Err(e) = self.streams.write(script.as_bytes()) {
                    self.set_state(SessionState::Failed);
                    let _ = ready.send(Err(e));
                    return true;
                }
                self.set_state(SessionState::Starting);
                self.startup_timeout = timeout;
                self.startup_deadline = Some(Instant::now() + timeout);
                self.ready = Some(ready);
                true
            }
            Control::Shutdown { done } => {
                if let Err(e) = self.streams.write(b"exit\n") {
                    debug!("Could not ask the shell to exit: {}", e);
                }
                self.shutdown_done = Some(done);
                false
            }
        }
    }

    fn handle_chunk(&mut self, chunk: StreamChunk) {
        let Some(event) = self.demux.feed(&chunk) else {
            return;
        };

        match event {
            DemuxEvent::Ready => self.handle_ready(),
            DemuxEvent::StartupFailed(stderr) => self.handle_startup_failure(stderr),
            DemuxEvent::Frame { text, stderr } => self.handle_frame(&text, &stderr),
            DemuxEvent::Incomplete => self.handle_incomplete(),
        }
    }

    fn handle_ready(&mut self) {
        self.busy = false;
        if self.state() != SessionState::Starting {
            debug!("Prompt seen before bootstrap; ignoring");
            return;
        }
        self.startup_deadline = None;
        self.set_state(SessionState::Ready);
        if let Some(ready) = self.ready.take() {
            let _ = ready.send(Ok(()));
        }
    }

    fn handle_startup_failure(&mut self, stderr: String) {
        self.busy = false;
        if self.state() != SessionState::Starting {
            debug!("Errors before bootstrap: {}", stderr.trim());
            return;
        }
        error!("Shell initialisation failed: {}", stderr.trim());
        self.startup_deadline = None;
        self.set_state(SessionState::Failed);
        if let Some(ready) = self.ready.take() {
            let _ = ready.send(Err(Error::StartupFailed { stderr }));
        }
    }

    fn handle_startup_timeout(&mut self) {
        self.startup_deadline = None;
        if self.state() != SessionState::Starting {
            return;
        }
        error!("Shell did not become ready within {:?}", self.startup_timeout);
        self.busy = false;
        self.set_state(SessionState::Failed);
        if let Some(ready) = self.ready.take() {
            let _ = ready.send(Err(Error::StartupTimeout {
                after: self.startup_timeout,
            }));
        }
    }

    fn handle_frame(&mut self, frame: &str, stderr: &str) {
        self.busy = false;
        if !stderr.trim().is_empty() {
            debug!("Shell stderr: {}", stderr.trim());
        }

        let Some(head) = self.queue.pop_dispatched() else {
            debug!("Frame with no command in flight");
            return;
        };
        let id = head.id;
        if !head.has_waiter() {
            debug!(%id, "Late frame discarded, caller stopped waiting");
            return;
        }

        let outcome: Result<Value> = {
            let table = self
                .error_table
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            classify(frame, &table).map_err(Error::Execution)
        };

        match &outcome {
            Ok(_) => debug!(%id, "Command completed"),
            Err(e) => debug!(%id, "Command failed: {}", e),
        }
        if !head.complete(outcome) {
            debug!(%id, "Result discarded, caller stopped waiting");
        }
    }

    fn handle_incomplete(&mut self) {
        if !self.busy {
            return;
        }
        if let Err(e) = self.streams.write(INTERRUPT) {
            warn!("Failed to interrupt the shell: {}", e);
        }
        // Still busy until the shell prints its next prompt
        if let Some(head) = self.queue.pop_dispatched() {
            warn!(id = %head.id, "Incomplete command: {}", head.command);
            let command = head.command.clone();
            head.complete(Err(Error::IncompleteCommand { command }));
        }
    }

    /// Write the head command if the shell is idle
    fn dispatch_next(&mut self) {
        if self.busy || !self.state().accepts_commands() {
            return;
        }
        debug_assert_eq!(self.queue.dispatched_count(), 0);

        let Some(head) = self.queue.next_to_dispatch() else {
            return;
        };

        let line = wrap_command(&head.command);
        match self.streams.write(line.as_bytes()) {
            Ok(()) => {
                head.mark_dispatched();
                debug!(id = %head.id, "Dispatched command");
                self.busy = true;
            }
            Err(e) => {
                error!("Failed to write command to shell: {}", e);
                if let Some(failed) = self.queue.pop_head() {
                    failed.complete(Err(e));
                }
            }
        }
    }

    /// Fail everything still waiting and mark the session closed
    fn close(&mut self) {
        let abandoned = self.queue.len();
        for pending in self.queue.drain() {
            pending.complete(Err(Error::SessionClosed));
        }
        if let Some(ready) = self.ready.take() {
            let _ = ready.send(Err(Error::SessionClosed));
        }
        if self.state() != SessionState::Failed {
            self.set_state(SessionState::Closed);
        }
        debug!("Session driver stopped, {} pending command(s) failed", abandoned);
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
