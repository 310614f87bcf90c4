//! Producer
//!
//! Waits for the source's delay, generates a command, publishes it.
//! Every wait wakes on shutdown.

use crossbeam::channel::{SendTimeoutError, Sender};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::command::Command;
use super::command_queue::PublishError;
use super::transcriber::Transcriber;
use crate::runtime::ShutdownSignal;

/// Phrases the simulated microphone can "hear"
pub const PHRASES: [&str; 3] = ["turn on the light", "move forward", "stop"];

/// Input seam for the producer
pub trait CommandSource: Send {
    /// How long to stay idle before the next command
    fn next_delay(&mut self) -> Duration;

    /// Produce the next command text, or `None` once the source is exhausted
    fn generate(&mut self) -> Option<String>;
}

/// Random phrases at random intervals
#[derive(Debug)]
pub struct SimulatedMicrophone {
    rng: StdRng,
    min_delay: Duration,
    max_delay: Duration,
}

impl Default for SimulatedMicrophone {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_millis(1500))
    }
}

impl SimulatedMicrophone {
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self::with_rng(StdRng::from_entropy(), min_delay, max_delay)
    }

    /// Deterministic variant for tests
    pub fn with_seed(seed: u64, min_delay: Duration, max_delay: Duration) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), min_delay, max_delay)
    }

    fn with_rng(rng: StdRng, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            rng,
            min_delay: min_delay.min(max_delay),
            max_delay: max_delay.max(min_delay),
        }
    }
}

impl CommandSource for SimulatedMicrophone {
    fn next_delay(&mut self) -> Duration {
        self.rng.gen_range(self.min_delay..=self.max_delay)
    }

    fn generate(&mut self) -> Option<String> {
        PHRASES.choose(&mut self.rng).map(|p| p.to_string())
    }
}

/// Replays a fixed script of `(delay, text)` pairs, then runs dry
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    script: VecDeque<(Duration, String)>,
}

impl ScriptedSource {
    pub fn new<I, S>(script: I) -> Self
    where
        I: IntoIterator<Item = (Duration, S)>,
        S: Into<String>,
    {
        Self {
            script: script.into_iter().map(|(d, s)| (d, s.into())).collect(),
        }
    }
}

impl CommandSource for ScriptedSource {
    fn next_delay(&mut self) -> Duration {
        self.script.front().map(|(d, _)| *d).unwrap_or(Duration::ZERO)
    }

    fn generate(&mut self) -> Option<String> {
        self.script.pop_front().map(|(_, text)| text)
    }
}

pub struct Producer<S> {
    source: S,
    sender: Sender<Command>,
    shutdown: ShutdownSignal,
    poll_interval: Duration,
    transcriber: Transcriber,
    next_seq: u64,
}

impl<S: CommandSource> Producer<S> {
    pub fn new(
        source: S,
        sender: Sender<Command>,
        shutdown: ShutdownSignal,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            sender,
            shutdown,
            poll_interval,
            transcriber: Transcriber::new(),
            next_seq: 0,
        }
    }

    /// Run until shutdown, source exhaustion, or consumer loss.
    /// Returns the number of commands published.
    pub fn run(mut self) -> u64 {
        info!("Producer started");

        while !self.shutdown.is_triggered() {
            let delay = self.source.next_delay();
            if self.shutdown.wait_timeout(delay) {
                break;
            }

            let Some(text) = self.source.generate() else {
                info!("Command source exhausted");
                break;
            };
            info!(seq = self.next_seq, %text, "[Mic] Heard");
            let command = Command::transcribed(self.next_seq, self.transcriber.transcribe(&text));
            debug!(seq = command.seq, lang = %command.lang, text = %command.text, "Transcribed");

            match self.publish(command) {
                Ok(()) => self.next_seq += 1,
                Err(PublishError::ShutDown) => break,
                Err(e) => {
                    warn!("Producer stopping: {}", e);
                    break;
                }
            }
        }

        info!(published = self.next_seq, "Producer stopped");
        self.next_seq
    }

    /// Blocking publish that re-checks shutdown every poll interval
    fn publish(&self, mut command: Command) -> Result<(), PublishError> {
        loop {
            match self.sender.send_timeout(command, self.poll_interval) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(returned)) => {
                    if self.shutdown.is_triggered() {
                        return Err(PublishError::ShutDown);
                    }
                    debug!(seq = returned.seq, "Command queue full, waiting");
                    command = returned;
                }
                Err(SendTimeoutError::Disconnected(_)) => return Err(PublishError::Disconnected),
            }
        }
    }
}
