//! Runtime
//!
//! Owns the shared handles (cache, metrics, shutdown signal) and runs each
//! long-lived task on its own named OS thread. Shutdown raises the signal
//! and waits a bounded grace period for every task to report back.

mod shutdown;

pub use shutdown::ShutdownSignal;

use crossbeam::channel::{self, Receiver, Sender};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::metrics::Metrics;
use crate::model::ModelConfig;
use crate::monitor::{Monitor, MonitorConfig};
use crate::pipeline::{
    CommandExecutor, CommandQueue, CommandSource, Consumer, FirmwareExecutor,
    LoggingFirmwareLink, PipelineConfig, Producer, SimulatedMicrophone,
};
use crate::storage::Cache;

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Checked by `start` before anything is spawned
    pub model: ModelConfig,
    pub pipeline: PipelineConfig,
    pub monitor: MonitorConfig,
    /// How long `shutdown` waits for tasks before giving up on them
    pub grace_period: Duration,
    /// Whether `start` launches the producer/consumer pair
    pub pipeline_enabled: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            pipeline: PipelineConfig::default(),
            monitor: MonitorConfig::default(),
            grace_period: Duration::from_secs(5),
            pipeline_enabled: true,
        }
    }
}

impl RuntimeConfig {
    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }

    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_monitor(mut self, monitor: MonitorConfig) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn without_pipeline(mut self) -> Self {
        self.pipeline_enabled = false;
        self
    }
}

/// How a task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Clean,
    Panicked(String),
}

/// Exit report sent by every task thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskExit {
    /// Unique per runtime; names may repeat
    pub id: u64,
    pub name: String,
    pub outcome: TaskOutcome,
}

struct Task {
    id: u64,
    name: String,
    handle: JoinHandle<()>,
}

pub struct Runtime {
    config: RuntimeConfig,
    cache: Cache,
    metrics: Arc<Metrics>,
    shutdown: ShutdownSignal,
    exit_tx: Sender<TaskExit>,
    exit_rx: Receiver<TaskExit>,
    tasks: Vec<Task>,
    next_task_id: u64,
    beats: Option<Arc<AtomicU64>>,
}

impl Runtime {
    pub fn new(config: RuntimeConfig, cache: Cache) -> Self {
        let (exit_tx, exit_rx) = channel::unbounded();
        Self {
            config,
            cache,
            metrics: Arc::new(Metrics::new()),
            shutdown: ShutdownSignal::new(),
            exit_tx,
            exit_rx,
            tasks: Vec::new(),
            next_task_id: 0,
            beats: None,
        }
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Heartbeats emitted so far (0 if the monitor was never started)
    pub fn heartbeats(&self) -> u64 {
        self.beats
            .as_ref()
            .map(|b| b.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Names of tasks that have not yet been reaped by `shutdown`
    pub fn task_names(&self) -> Vec<String> {
        self.tasks.iter().map(|task| task.name.clone()).collect()
    }

    /// Validate the model config, then start the monitor and, if enabled,
    /// the default pipeline
    pub fn start(&mut self) -> Result<()> {
        self.config.model.validate()?;
        let env = self.config.model.check_environment();
        debug!(realtime = env.realtime, "Environment checked");

        self.start_monitor()?;

        if self.config.pipeline_enabled {
            let p = &self.config.pipeline;
            let source = SimulatedMicrophone::new(p.min_delay, p.max_delay);
            let executor = FirmwareExecutor::new(LoggingFirmwareLink, p.action_duration)
                .with_emergency_stop(self.shutdown.clone());
            self.start_pipeline(source, executor)?;
        }

        Ok(())
    }

    pub fn start_monitor(&mut self) -> Result<()> {
        let monitor = Monitor::new(self.config.monitor.clone(), self.shutdown.clone());
        self.beats = Some(monitor.beat_counter());
        self.spawn_task("monitor", move || monitor.run())
    }

    /// Wire a producer and a consumer through a fresh bounded queue
    pub fn start_pipeline<S, E>(&mut self, source: S, executor: E) -> Result<()>
    where
        S: CommandSource + 'static,
        E: CommandExecutor + 'static,
    {
        let p = self.config.pipeline.clone();
        let queue = CommandQueue::new(p.queue_capacity);
        info!(capacity = queue.capacity(), journal = p.journal, "Starting command pipeline");

        let producer = Producer::new(
            source,
            queue.sender(),
            self.shutdown.clone(),
            p.poll_interval,
        );
        let mut consumer = Consumer::new(
            executor,
            queue.receiver(),
            self.shutdown.clone(),
            p.poll_interval,
            self.metrics.clone(),
        );
        if p.journal {
            consumer = consumer.with_journal(self.cache.clone());
        }
        // Only the two tasks hold queue ends from here on.
        drop(queue);

        self.spawn_task("consumer", move || {
            consumer.run();
        })?;
        self.spawn_task("producer", move || {
            producer.run();
        })
    }

    /// Run `body` on a named thread. A panic is contained and reported as
    /// [`TaskOutcome::Panicked`]; other tasks keep running.
    pub fn spawn_task<F>(&mut self, name: &str, body: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let exit_tx = self.exit_tx.clone();
        let task_name = name.to_string();
        let id = self.next_task_id;
        self.next_task_id += 1;

        let handle = thread::Builder::new()
            .name(format!("voxcache-{}", name))
            .spawn(move || {
                let outcome = match catch_unwind(AssertUnwindSafe(body)) {
                    Ok(()) => TaskOutcome::Clean,
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        error!(task = %task_name, "Task panicked: {}", message);
                        TaskOutcome::Panicked(message)
                    }
                };
                debug!(task = %task_name, "Task exited");
                let _ = exit_tx.send(TaskExit {
                    id,
                    name: task_name,
                    outcome,
                });
            })
            .map_err(|source| Error::Spawn {
                name: name.to_string(),
                source,
            })?;

        self.tasks.push(Task {
            id,
            name: name.to_string(),
            handle,
        });
        Ok(())
    }

    /// Raise the shutdown signal and wait up to the configured grace period.
    ///
    /// Tasks that miss the deadline are detached and named in
    /// [`Error::ShutdownTimeout`]; they die with the process.
    pub fn shutdown(mut self) -> Result<Vec<TaskExit>> {
        let grace = self.config.grace_period;
        info!(
            "Initiating shutdown with {:?} grace period, {} active tasks",
            grace,
            self.tasks.len()
        );
        self.shutdown.trigger();

        let deadline = Instant::now() + grace;
        let mut exits = Vec::with_capacity(self.tasks.len());

        while !self.tasks.is_empty() {
            let Ok(exit) = self.exit_rx.recv_deadline(deadline) else {
                break;
            };
            if let Some(pos) = self.tasks.iter().position(|task| task.id == exit.id) {
                let task = self.tasks.swap_remove(pos);
                // The body already returned. Reap the thread only if it is
                // fully gone; otherwise dropping the handle detaches it.
                if task.handle.is_finished() {
                    let _ = task.handle.join();
                }
            }
            exits.push(exit);
        }

        if self.tasks.is_empty() {
            info!("All {} tasks stopped", exits.len());
            return Ok(exits);
        }

        let stuck: Vec<String> = self.tasks.drain(..).map(|task| task.name).collect();
        warn!(
            stopped = exits.len(),
            "Detaching {} task(s) that missed the grace period",
            stuck.len()
        );
        Err(Error::ShutdownTimeout { tasks: stuck })
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelConfigError;

    fn quick_config() -> RuntimeConfig {
        RuntimeConfig::default()
            .with_monitor(MonitorConfig::default().with_interval(Duration::from_millis(20)))
            .with_grace_period(Duration::from_secs(2))
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[test]
    fn test_monitor_only_runtime_stops_cleanly() {
        let mut runtime = Runtime::new(quick_config().without_pipeline(), Cache::new());
        runtime.start().unwrap();
        assert_eq!(runtime.task_names(), vec!["monitor"]);

        thread::sleep(Duration::from_millis(70));
        assert!(runtime.heartbeats() >= 1);

        let exits = runtime.shutdown().unwrap();
        assert_eq!(
            exits,
            vec![TaskExit {
                id: 0,
                name: "monitor".into(),
                outcome: TaskOutcome::Clean
            }]
        );
    }

    #[test]
    fn test_panicking_task_is_isolated() {
        let mut runtime = Runtime::new(quick_config().without_pipeline(), Cache::new());
        runtime.start().unwrap();
        runtime
            .spawn_task("flaky", || panic!("flaky task blew up"))
            .unwrap();

        thread::sleep(Duration::from_millis(80));
        let before = runtime.heartbeats();
        thread::sleep(Duration::from_millis(80));
        assert!(runtime.heartbeats() > before, "monitor stopped beating");

        let exits = runtime.shutdown().unwrap();
        let flaky = exits.iter().find(|e| e.name == "flaky").unwrap();
        assert_eq!(
            flaky.outcome,
            TaskOutcome::Panicked("flaky task blew up".into())
        );
        let monitor = exits.iter().find(|e| e.name == "monitor").unwrap();
        assert_eq!(monitor.outcome, TaskOutcome::Clean);
    }

    #[test]
    fn test_stuck_task_reported_after_grace() {
        let mut runtime = Runtime::new(
            quick_config()
                .without_pipeline()
                .with_grace_period(Duration::from_millis(100)),
            Cache::new(),
        );
        runtime.start().unwrap();
        runtime
            .spawn_task("stubborn", || thread::sleep(Duration::from_secs(3)))
            .unwrap();

        let start = Instant::now();
        match runtime.shutdown() {
            Err(Error::ShutdownTimeout { tasks }) => assert_eq!(tasks, vec!["stubborn"]),
            other => panic!("expected shutdown timeout, got {:?}", other),
        }
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_duplicate_names_do_not_extend_grace() {
        let mut runtime = Runtime::new(
            quick_config()
                .without_pipeline()
                .with_grace_period(Duration::from_millis(200)),
            Cache::new(),
        );
        runtime
            .spawn_task("worker", || thread::sleep(Duration::from_secs(3)))
            .unwrap();
        runtime.spawn_task("worker", || {}).unwrap();

        let start = Instant::now();
        match runtime.shutdown() {
            Err(Error::ShutdownTimeout { tasks }) => assert_eq!(tasks, vec!["worker"]),
            other => panic!("expected shutdown timeout, got {:?}", other),
        }
        assert!(
            start.elapsed() < Duration::from_secs(1),
            "shutdown took {:?}",
            start.elapsed()
        );
    }

    #[test]
    fn test_exit_reports_carry_distinct_ids() {
        let mut runtime = Runtime::new(quick_config().without_pipeline(), Cache::new());
        runtime.spawn_task("worker", || {}).unwrap();
        runtime.spawn_task("worker", || {}).unwrap();

        let mut ids: Vec<_> = runtime.shutdown().unwrap().iter().map(|e| e.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_invalid_model_config_blocks_start() {
        let mut runtime = Runtime::new(
            quick_config().with_model(ModelConfig::new("", "realtime")),
            Cache::new(),
        );
        assert!(matches!(
            runtime.start(),
            Err(Error::Model(ModelConfigError::EmptyName))
        ));
        assert!(runtime.task_names().is_empty());
    }
}
