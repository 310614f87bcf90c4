//! Storage Engine
//!
//! In-memory key-value cache behind a reader/writer lock.

mod cache;

pub use cache::{Cache, Lookup};
