//! Shutdown Signal
//!
//! One cooperative cancellation flag shared by every long-running task.
//! Async code awaits the inner `CancellationToken`; OS threads park on a
//! wake channel whose only sender is dropped when the signal fires, so any
//! `recv_timeout` or `select!` on it returns immediately.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    token: CancellationToken,
    closer: Arc<Mutex<Option<Sender<()>>>>,
    wake: Receiver<()>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, rx) = channel::bounded(0);
        Self {
            token: CancellationToken::new(),
            closer: Arc::new(Mutex::new(Some(tx))),
            wake: rx,
        }
    }

    /// Raise the signal. Returns `true` only for the call that flipped it.
    pub fn trigger(&self) -> bool {
        // Flag first, then wake: a woken thread must already see the flag.
        self.token.cancel();
        let first = self.closer.lock().take().is_some();
        if first {
            info!("Shutdown signal raised");
        }
        first
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal has been raised
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Owned token, for futures that must be `'static`
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Receiver that disconnects when the signal is raised, for `select!`
    pub fn wake_receiver(&self) -> Receiver<()> {
        self.wake.clone()
    }

    /// Sleep up to `timeout`, waking early on shutdown.
    /// Returns `true` if the signal has been raised.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        match self.wake.recv_timeout(timeout) {
            Err(RecvTimeoutError::Disconnected) => true,
            _ => self.is_triggered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_trigger_once() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_triggered());

        assert!(signal.trigger());
        assert!(!signal.trigger());
        assert!(signal.is_triggered());
        assert!(signal.clone().is_triggered());
    }

    #[test]
    fn test_wait_timeout_expires_without_signal() {
        let signal = ShutdownSignal::new();
        let start = Instant::now();
        assert!(!signal.wait_timeout(Duration::from_millis(50)));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_wait_timeout_wakes_on_trigger() {
        let signal = ShutdownSignal::new();
        let waiter = signal.clone();

        let handle = thread::spawn(move || {
            let start = Instant::now();
            let stopped = waiter.wait_timeout(Duration::from_secs(30));
            (stopped, start.elapsed())
        });

        thread::sleep(Duration::from_millis(50));
        signal.trigger();

        let (stopped, elapsed) = handle.join().unwrap();
        assert!(stopped);
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_wait_after_trigger_is_immediate() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        assert!(signal.wait_timeout(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_async_cancelled() {
        let signal = ShutdownSignal::new();
        let waiter = signal.clone();
        let task = tokio::spawn(async move { waiter.cancelled().await });

        signal.trigger();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("cancelled() did not resolve")
            .unwrap();
    }
}
