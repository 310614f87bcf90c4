//! Command Pipeline
//!
//! Producer → bounded queue → consumer. The producer simulates variable
//! latency input and transcribes it before publishing; the consumer
//! executes commands strictly in FIFO order.

mod command;
mod command_queue;
mod consumer;
mod producer;
mod transcriber;

pub use command::{Command, FirmwareCommand, DEFAULT_SPEED};
pub use command_queue::{CommandQueue, PublishError};
pub use consumer::{
    CommandExecutor, Consumer, ConsumerStats, ExecutionError, FirmwareExecutor, FirmwareLink,
    LoggingFirmwareLink,
};
pub use producer::{CommandSource, Producer, ScriptedSource, SimulatedMicrophone, PHRASES};
pub use transcriber::{Language, Transcriber, Transcription, TRANSLATED_PREFIX};

use std::time::Duration;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Command queue capacity
    pub queue_capacity: usize,
    /// Upper bound on how long a blocked producer or idle consumer goes
    /// without re-checking shutdown
    pub poll_interval: Duration,
    /// Simulated duration of one firmware action
    pub action_duration: Duration,
    /// Simulated microphone delay range
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Journal executed commands into the cache
    pub journal: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 32,
            poll_interval: Duration::from_millis(100),
            action_duration: Duration::from_millis(500),
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(1500),
            journal: false,
        }
    }
}

impl PipelineConfig {
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_action_duration(mut self, duration: Duration) -> Self {
        self.action_duration = duration;
        self
    }

    pub fn with_delay_range(mut self, min: Duration, max: Duration) -> Self {
        self.min_delay = min;
        self.max_delay = max;
        self
    }

    pub fn with_journal(mut self, journal: bool) -> Self {
        self.journal = journal;
        self
    }
}
