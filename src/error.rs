//! Error types

use std::io;
use thiserror::Error;

use crate::model::ModelConfigError;

/// Errors raised while starting, serving, or stopping voxcache components
#[derive(Debug, Error)]
pub enum Error {
    /// The speech model configuration was rejected before startup
    #[error("invalid model config: {0}")]
    Model(#[from] ModelConfigError),

    /// The facade listener could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    /// The facade stopped with an I/O error
    #[error("server failed: {0}")]
    Serve(#[source] io::Error),

    /// A background task thread could not be created
    #[error("failed to spawn task {name}: {source}")]
    Spawn { name: String, source: io::Error },

    /// Some tasks did not observe the shutdown signal in time
    #[error("tasks did not stop within the grace period: {}", .tasks.join(", "))]
    ShutdownTimeout { tasks: Vec<String> },
}

pub type Result<T> = std::result::Result<T, Error>;
