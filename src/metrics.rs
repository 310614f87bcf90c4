//! Basic Metrics
//!
//! Lookup and command-execution counters with latency tracking. Every
//! field is an atomic, so recording never takes a lock and never contends
//! with the cache's own guard.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Operation label for cache lookups
pub const OP_LOOKUP: &str = "lookup";
/// Operation label for pipeline command executions
pub const OP_EXECUTE: &str = "execute";

/// The kinds of operation tracked, each with its own latency aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Lookup,
    Execute,
}

impl OpKind {
    pub const ALL: [OpKind; 2] = [OpKind::Lookup, OpKind::Execute];

    pub fn label(self) -> &'static str {
        match self {
            OpKind::Lookup => OP_LOOKUP,
            OpKind::Execute => OP_EXECUTE,
        }
    }
}

/// Count and latency aggregate for one operation kind
#[derive(Debug)]
struct KindStats {
    count: AtomicU64,
    latency_sum_us: AtomicU64,
    latency_min_us: AtomicU64,
    latency_max_us: AtomicU64,
}

impl KindStats {
    fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
            latency_min_us: AtomicU64::new(u64::MAX),
            latency_max_us: AtomicU64::new(0),
        }
    }

    fn record(&self, latency: Duration) {
        let latency_us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.latency_min_us.fetch_min(latency_us, Ordering::Relaxed);
        self.latency_max_us.fetch_max(latency_us, Ordering::Relaxed);
    }

    fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    fn avg_us(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        self.latency_sum_us.load(Ordering::Relaxed) as f64 / count as f64
    }

    fn min_us(&self) -> u64 {
        match self.latency_min_us.load(Ordering::Relaxed) {
            u64::MAX => 0,
            min => min,
        }
    }

    fn max_us(&self) -> u64 {
        self.latency_max_us.load(Ordering::Relaxed)
    }
}

/// Metrics collector
#[derive(Debug)]
pub struct Metrics {
    lookups: KindStats,
    executions: KindStats,

    lookup_hits: AtomicU64,
    lookup_misses: AtomicU64,
    commands_failed: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self {
            lookups: KindStats::new(),
            executions: KindStats::new(),
            lookup_hits: AtomicU64::new(0),
            lookup_misses: AtomicU64::new(0),
            commands_failed: AtomicU64::new(0),
        }
    }

    fn stats(&self, kind: OpKind) -> &KindStats {
        match kind {
            OpKind::Lookup => &self.lookups,
            OpKind::Execute => &self.executions,
        }
    }

    /// Record a cache lookup and whether it found the key
    pub fn record_lookup(&self, hit: bool, latency: Duration) {
        let counter = if hit {
            &self.lookup_hits
        } else {
            &self.lookup_misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.record_operation(OpKind::Lookup, latency);
    }

    /// Record one pipeline command execution
    pub fn record_execution(&self, succeeded: bool, latency: Duration) {
        if !succeeded {
            self.commands_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.record_operation(OpKind::Execute, latency);
    }

    /// Record an operation
    pub fn record_operation(&self, kind: OpKind, latency: Duration) {
        self.stats(kind).record(latency);
    }

    /// Get total operations count
    pub fn total_ops(&self) -> u64 {
        OpKind::ALL.iter().map(|&kind| self.stats(kind).count()).sum()
    }

    /// Get operations by kind
    pub fn ops_by_kind(&self) -> HashMap<String, u64> {
        OpKind::ALL
            .iter()
            .map(|&kind| (kind.label().to_string(), self.stats(kind).count()))
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    pub fn lookup_hits(&self) -> u64 {
        self.lookup_hits.load(Ordering::Relaxed)
    }

    pub fn lookup_misses(&self) -> u64 {
        self.lookup_misses.load(Ordering::Relaxed)
    }

    /// Commands attempted, successful or not
    pub fn commands_executed(&self) -> u64 {
        self.executions.count()
    }

    pub fn commands_failed(&self) -> u64 {
        self.commands_failed.load(Ordering::Relaxed)
    }

    /// Get average latency in microseconds for one kind
    pub fn avg_latency_us(&self, kind: OpKind) -> f64 {
        self.stats(kind).avg_us()
    }

    /// Get min latency in microseconds for one kind
    pub fn min_latency_us(&self, kind: OpKind) -> u64 {
        self.stats(kind).min_us()
    }

    /// Get max latency in microseconds for one kind
    pub fn max_latency_us(&self, kind: OpKind) -> u64 {
        self.stats(kind).max_us()
    }

    /// Get a summary of metrics
    pub fn summary(&self) -> String {
        format!(
            "Lookups: {} hit / {} miss (µs avg={:.1}, min={}, max={}) | Commands: {} executed, {} failed (µs avg={:.1}, min={}, max={})",
            self.lookup_hits(),
            self.lookup_misses(),
            self.lookups.avg_us(),
            self.lookups.min_us(),
            self.lookups.max_us(),
            self.commands_executed(),
            self.commands_failed(),
            self.executions.avg_us(),
            self.executions.min_us(),
            self.executions.max_us()
        )
    }
}
