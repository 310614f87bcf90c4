//! Consumer
//!
//! Dequeues commands in FIFO order and executes them one at a time.
//! A failing or panicking execution is logged and counted; the loop
//! moves on to the next entry.

use crossbeam::channel::{select, Receiver};
use serde::Serialize;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::command::{Command, FirmwareCommand};
use crate::metrics::Metrics;
use crate::runtime::{panic_message, ShutdownSignal};
use crate::storage::Cache;

/// Failure while executing a single command
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("firmware link error: {0}")]
    Link(#[from] io::Error),

    #[error("command rejected: {0}")]
    Rejected(String),
}

/// Executes one dequeued command
pub trait CommandExecutor: Send {
    fn execute(&mut self, command: &Command) -> Result<FirmwareCommand, ExecutionError>;
}

/// Transport to the firmware (UART, CAN, ...)
pub trait FirmwareLink: Send {
    fn send(&mut self, command: FirmwareCommand) -> io::Result<()>;
}

/// Link that only logs what it would send
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingFirmwareLink;

impl FirmwareLink for LoggingFirmwareLink {
    fn send(&mut self, command: FirmwareCommand) -> io::Result<()> {
        info!("[FW CMD] -> {}", command);
        Ok(())
    }
}

/// Default executor: recognize, send to the firmware, simulate the action
pub struct FirmwareExecutor<L> {
    link: L,
    action_duration: Duration,
    /// Raised when an emergency stop is executed
    emergency: Option<ShutdownSignal>,
}

impl<L: FirmwareLink> FirmwareExecutor<L> {
    pub fn new(link: L, action_duration: Duration) -> Self {
        Self {
            link,
            action_duration,
            emergency: None,
        }
    }

    /// Trigger this signal when an emergency stop goes through
    pub fn with_emergency_stop(mut self, shutdown: ShutdownSignal) -> Self {
        self.emergency = Some(shutdown);
        self
    }
}

impl<L: FirmwareLink> CommandExecutor for FirmwareExecutor<L> {
    fn execute(&mut self, command: &Command) -> Result<FirmwareCommand, ExecutionError> {
        if command.text.trim().is_empty() {
            return Err(ExecutionError::Rejected("empty command".to_string()));
        }

        let firmware = FirmwareCommand::recognize(&command.text);
        self.link.send(firmware)?;

        if firmware == FirmwareCommand::EmergencyStop {
            warn!(seq = command.seq, "Emergency stop executed");
            if let Some(shutdown) = &self.emergency {
                shutdown.trigger();
            }
            return Ok(firmware);
        }

        thread::sleep(self.action_duration);
        Ok(firmware)
    }
}

/// Totals reported when the consumer stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    /// Commands dequeued and handed to the executor, including failures
    pub attempted: u64,
    /// Attempts that returned an error or panicked
    pub failed: u64,
}

/// Journal record stored under `cmd:<seq>`
#[derive(Debug, Serialize)]
struct JournalEntry<'a> {
    #[serde(flatten)]
    command: &'a Command,
    firmware: String,
}

pub struct Consumer<E> {
    executor: E,
    receiver: Receiver<Command>,
    shutdown: ShutdownSignal,
    poll_interval: Duration,
    metrics: Arc<Metrics>,
    journal: Option<Cache>,
    stats: ConsumerStats,
}

impl<E: CommandExecutor> Consumer<E> {
    pub fn new(
        executor: E,
        receiver: Receiver<Command>,
        shutdown: ShutdownSignal,
        poll_interval: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            executor,
            receiver,
            shutdown,
            poll_interval,
            metrics,
            journal: None,
            stats: ConsumerStats::default(),
        }
    }

    /// Record each successful execution in `cache` under `cmd:<seq>`
    pub fn with_journal(mut self, cache: Cache) -> Self {
        self.journal = Some(cache);
        self
    }

    /// Run until shutdown or until every producer is gone and the queue is drained
    pub fn run(mut self) -> ConsumerStats {
        info!("Consumer started");
        let receiver = self.receiver.clone();
        let wake = self.shutdown.wake_receiver();

        while !self.shutdown.is_triggered() {
            select! {
                recv(receiver) -> msg => match msg {
                    Ok(command) => self.handle(command),
                    Err(_) => {
                        info!("Command queue closed");
                        break;
                    }
                },
                recv(wake) -> _ => break,
                default(self.poll_interval) => {}
            }
        }

        info!(
            attempted = self.stats.attempted,
            failed = self.stats.failed,
            "Consumer stopped"
        );
        self.stats
    }

    fn handle(&mut self, command: Command) {
        let start = Instant::now();
        let executor = &mut self.executor;
        let result = catch_unwind(AssertUnwindSafe(|| executor.execute(&command)));
        let elapsed = start.elapsed();

        let succeeded = match result {
            Ok(Ok(firmware)) => {
                info!(seq = command.seq, text = %command.text, %firmware, "[Processor] Executed command");
                self.record(&command, firmware);
                true
            }
            Ok(Err(e)) => {
                warn!(seq = command.seq, text = %command.text, "Command failed: {}", e);
                false
            }
            Err(payload) => {
                error!(
                    seq = command.seq,
                    text = %command.text,
                    "Command panicked: {}",
                    panic_message(payload.as_ref())
                );
                false
            }
        };

        self.stats.attempted += 1;
        if !succeeded {
            self.stats.failed += 1;
        }
        self.metrics.record_execution(succeeded, elapsed);
    }

    fn record(&self, command: &Command, firmware: FirmwareCommand) {
        let Some(cache) = &self.journal else {
            return;
        };
        let key = format!("cmd:{}", command.seq);
        let entry = JournalEntry {
            command,
            firmware: firmware.to_string(),
        };
        match serde_json::to_value(&entry) {
            Ok(value) => {
                debug!(%key, "Journaling command");
                cache.put(key, value);
            }
            Err(e) => warn!(%key, "Failed to serialize journal entry: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::CommandQueue;
    use parking_lot::Mutex;

    /// Records texts; fails on "bad", panics on "boom"
    struct RecordingExecutor {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl CommandExecutor for RecordingExecutor {
        fn execute(&mut self, command: &Command) -> Result<FirmwareCommand, ExecutionError> {
            match command.text.as_str() {
                "bad" => Err(ExecutionError::Rejected("bad".into())),
                "boom" => panic!("executor exploded"),
                text => {
                    self.seen.lock().push(text.to_string());
                    Ok(FirmwareCommand::recognize(text))
                }
            }
        }
    }

    struct BrokenLink;

    impl FirmwareLink for BrokenLink {
        fn send(&mut self, _command: FirmwareCommand) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "uart unplugged"))
        }
    }

    fn fill(queue: &CommandQueue, texts: &[&str]) {
        for (seq, text) in texts.iter().enumerate() {
            queue
                .send_timeout(Command::new(seq as u64, *text), Duration::from_millis(10))
                .unwrap();
        }
    }

    fn recording() -> (RecordingExecutor, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (RecordingExecutor { seen: seen.clone() }, seen)
    }

    #[test]
    fn test_executes_in_fifo_order_and_drains_on_close() {
        let queue = CommandQueue::new(16);
        fill(&queue, &["a", "b", "c"]);
        let receiver = queue.receiver();
        drop(queue);

        let (executor, seen) = recording();
        let metrics = Arc::new(Metrics::new());
        let consumer = Consumer::new(
            executor,
            receiver,
            ShutdownSignal::new(),
            Duration::from_millis(10),
            metrics.clone(),
        );

        let stats = consumer.run();
        assert_eq!(stats, ConsumerStats { attempted: 3, failed: 0 });
        assert_eq!(*seen.lock(), vec!["a", "b", "c"]);
        assert_eq!(metrics.commands_executed(), 3);
    }

    #[test]
    fn test_failures_do_not_stop_the_loop() {
        let queue = CommandQueue::new(16);
        fill(&queue, &["a", "bad", "boom", "b"]);
        let receiver = queue.receiver();
        drop(queue);

        let (executor, seen) = recording();
        let metrics = Arc::new(Metrics::new());
        let stats = Consumer::new(
            executor,
            receiver,
            ShutdownSignal::new(),
            Duration::from_millis(10),
            metrics.clone(),
        )
        .run();

        assert_eq!(stats, ConsumerStats { attempted: 4, failed: 2 });
        assert_eq!(*seen.lock(), vec!["a", "b"]);
        assert_eq!(metrics.commands_failed(), 2);
    }

    #[test]
    fn test_link_error_is_execution_failure() {
        let mut executor = FirmwareExecutor::new(BrokenLink, Duration::ZERO);
        let err = executor.execute(&Command::new(0, "stop")).unwrap_err();
        assert!(matches!(err, ExecutionError::Link(_)));
    }

    #[test]
    fn test_empty_command_rejected() {
        let mut executor = FirmwareExecutor::new(LoggingFirmwareLink, Duration::ZERO);
        let err = executor.execute(&Command::new(0, "   ")).unwrap_err();
        assert!(matches!(err, ExecutionError::Rejected(_)));
    }

    #[test]
    fn test_emergency_stop_raises_shutdown() {
        let shutdown = ShutdownSignal::new();
        let mut executor = FirmwareExecutor::new(LoggingFirmwareLink, Duration::ZERO)
            .with_emergency_stop(shutdown.clone());

        let firmware = executor.execute(&Command::new(0, "emergency stop")).unwrap();
        assert_eq!(firmware, FirmwareCommand::EmergencyStop);
        assert!(shutdown.is_triggered());
    }

    #[test]
    fn test_journal_writes_to_cache() {
        let queue = CommandQueue::new(4);
        fill(&queue, &["set speed to 80"]);
        let receiver = queue.receiver();
        drop(queue);

        let cache = Cache::new();
        let executor = FirmwareExecutor::new(LoggingFirmwareLink, Duration::ZERO);
        Consumer::new(
            executor,
            receiver,
            ShutdownSignal::new(),
            Duration::from_millis(10),
            Arc::new(Metrics::new()),
        )
        .with_journal(cache.clone())
        .run();

        let (value, exists) = cache.get("cmd:0");
        assert!(exists);
        let value = value.unwrap();
        assert_eq!(value["firmware"], "SET_SPEED:80");
        assert_eq!(value["text"], "set speed to 80");
        assert_eq!(value["seq"], 0);
        assert_eq!(value["lang"], "en");
        assert!(value["heard_at"].is_string());
    }

    #[test]
    fn test_idle_consumer_stops_on_shutdown() {
        let queue = CommandQueue::new(4);
        let shutdown = ShutdownSignal::new();
        let (executor, _seen) = recording();
        let consumer = Consumer::new(
            executor,
            queue.receiver(),
            shutdown.clone(),
            Duration::from_secs(30),
            Arc::new(Metrics::new()),
        );

        let handle = thread::spawn(move || consumer.run());
        thread::sleep(Duration::from_millis(50));

        let start = Instant::now();
        shutdown.trigger();
        let stats = handle.join().unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(stats.attempted, 0);
    }
}
