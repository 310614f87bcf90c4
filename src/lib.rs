//! VOXCACHE - Concurrent In-Memory Cache with a Voice-Command Pipeline
//!
//! A reader/writer-locked key-value cache reachable in-process and over an
//! HTTP/JSON facade, next to a producer → bounded queue → consumer pipeline
//! and an independent heartbeat monitor. All long-running tasks share a
//! single cooperative shutdown signal.

pub mod error;
pub mod metrics;
pub mod model;
pub mod monitor;
pub mod pipeline;
pub mod runtime;
pub mod server;
pub mod storage;

pub use error::{Error, Result};
pub use metrics::{Metrics, OpKind};
pub use model::{ModelConfig, ModelConfigError};
pub use monitor::{Monitor, MonitorConfig};
pub use pipeline::{Command, CommandQueue, FirmwareCommand, PipelineConfig};
pub use runtime::{Runtime, RuntimeConfig, ShutdownSignal, TaskExit, TaskOutcome};
pub use server::{Config, Server};
pub use storage::{Cache, Lookup};
