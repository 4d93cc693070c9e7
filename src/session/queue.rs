//! Command Queue
//!
//! FIFO of pending commands. Only the head may be dispatched, and at most one
//! entry is dispatched at any time.

use std::collections::VecDeque;

use crate::models::PendingCommand;

#[derive(Debug, Default)]
pub struct CommandQueue {
    entries: VecDeque<PendingCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command at the tail
    pub fn push(&mut self, command: PendingCommand) {
        self.entries.push_back(command);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn head(&self) -> Option<&PendingCommand> {
        self.entries.front()
    }

    /// The head, if it is waiting to be written to the shell
    pub fn next_to_dispatch(&mut self) -> Option<&mut PendingCommand> {
        self.entries.front_mut().filter(|head| !head.dispatched)
    }

    /// Remove the head if it has been dispatched
    pub fn pop_dispatched(&mut self) -> Option<PendingCommand> {
        if self.entries.front().map(|head| head.dispatched).unwrap_or(false) {
            self.entries.pop_front()
        } else {
            None
        }
    }

    /// Remove the head whatever its state
    pub fn pop_head(&mut self) -> Option<PendingCommand> {
        self.entries.pop_front()
    }

    /// Number of dispatched entries; never more than one
    pub fn dispatched_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.dispatched).count()
    }

    /// Remove every entry, in order
    pub fn drain(&mut self) -> impl Iterator<Item = PendingCommand> + '_ {
        self.entries.drain(..)
    }
}
