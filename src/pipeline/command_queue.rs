//! Command Queue
//!
//! Bounded FIFO queue carrying recognized commands from the producer to
//! the consumer. It is the only channel between the two tasks.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use std::time::Duration;
use thiserror::Error;

use super::command::Command;

/// Why a command could not be published
#[derive(Debug, Error)]
pub enum PublishError {
    /// Shutdown was raised while waiting for room in a full queue
    #[error("shutdown while queue was full")]
    ShutDown,
    /// The consumer side is gone
    #[error("command queue disconnected")]
    Disconnected,
}

/// Bounded command queue
///
/// Backed by a crossbeam bounded channel. When full, senders block
/// (in timeout slices, see [`super::Producer`]) rather than dropping entries.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    sender: Sender<Command>,
    receiver: Receiver<Command>,
    capacity: usize,
}

impl CommandQueue {
    /// Create a new command queue with given capacity (at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = channel::bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Get a sender handle for producers
    pub fn sender(&self) -> Sender<Command> {
        self.sender.clone()
    }

    /// Get a receiver handle for consumers
    pub fn receiver(&self) -> Receiver<Command> {
        self.receiver.clone()
    }

    /// Send with timeout
    pub fn send_timeout(
        &self,
        command: Command,
        timeout: Duration,
    ) -> Result<(), SendTimeoutError<Command>> {
        self.sender.send_timeout(command, timeout)
    }

    /// Receive with timeout
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Command, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Get current queue length (approximate)
    pub fn len(&self) -> usize {
        self.sender.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.sender.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
