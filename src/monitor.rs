//! Independent Monitor
//!
//! Heartbeat task with no data coupling to the cache or the pipeline.
//! It shares only the shutdown signal.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::runtime::ShutdownSignal;

/// Monitor configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between heartbeats
    pub interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
        }
    }
}

impl MonitorConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

pub struct Monitor {
    config: MonitorConfig,
    shutdown: ShutdownSignal,
    beats: Arc<AtomicU64>,
}

impl Monitor {
    pub fn new(config: MonitorConfig, shutdown: ShutdownSignal) -> Self {
        Self {
            config,
            shutdown,
            beats: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared heartbeat counter, readable after the monitor is moved onto its thread
    pub fn beat_counter(&self) -> Arc<AtomicU64> {
        self.beats.clone()
    }

    /// Emit a heartbeat every interval until shutdown
    pub fn run(self) {
        info!(interval = ?self.config.interval, "Monitor started");

        while !self.shutdown.is_triggered() {
            let beat = self.beats.fetch_add(1, Ordering::Relaxed) + 1;
            info!(beat, "[Monitor] System OK");

            if self.shutdown.wait_timeout(self.config.interval) {
                break;
            }
        }

        info!("Monitor stopped");
    }
}
