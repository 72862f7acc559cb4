//! Sentinel file waits.
//!
//! A wait watches the directory that will receive the sentinel and wakes on filesystem events. The
//! poll interval bounds the time between two existence checks, so a wait whose watcher cannot be
//! installed (missing directory, exhausted inotify watches) still behaves like the fixed-interval
//! poll, and every wait returns within `timeout + poll_interval`.
//!
//! Timing out is not an error. The caller treats continued absence of the sentinel as a failure
//! when it reads the file.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use harness_core::markers::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_WAIT_TIMEOUT_SECS};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Appeared,
    TimedOut,
    Cancelled,
}

#[derive(Debug, Default)]
struct Signal {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

impl Signal {
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.cancelled.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        // Taking the lock orders the wake-up after a waiter's existence check.
        drop(self.lock());
        self.wake.notify_all();
    }
}

/// Cancels the waits it is passed to, from any thread.
///
/// Cancellation is sticky: every wait using a cancelled token returns
/// [`WaitOutcome::Cancelled`] immediately.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    signal: Arc<Signal>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        *self.signal.lock() = true;
        self.signal.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.signal.lock()
    }
}

/// Waits for files to appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileWaiter {
    timeout: Duration,
    poll_interval: Duration,
}

impl Default for FileWaiter {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_WAIT_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

impl FileWaiter {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Wait for `path` with a token nobody else holds.
    pub fn wait_for(&self, path: &Path) -> WaitOutcome {
        self.wait(path, &CancelToken::new())
    }

    /// Wait until `path` exists, the timeout elapses, or `cancel` is triggered.
    pub fn wait(&self, path: &Path, cancel: &CancelToken) -> WaitOutcome {
        // An unrepresentable deadline means the wait only ends on appearance or cancellation.
        let deadline = Instant::now().checked_add(self.timeout);
        let _watcher = watch_parent(path, Arc::clone(&cancel.signal));

        let signal = &cancel.signal;
        let mut cancelled = signal.lock();
        loop {
            if *cancelled {
                tracing::debug!(path = %path.display(), "wait cancelled");
                return WaitOutcome::Cancelled;
            }
            if path.exists() {
                return WaitOutcome::Appeared;
            }
            let now = Instant::now();
            let slice = match deadline {
                Some(deadline) if now >= deadline => {
                    tracing::warn!(path = %path.display(), timeout = ?self.timeout, "sentinel did not appear");
                    return WaitOutcome::TimedOut;
                }
                Some(deadline) => (deadline - now).min(self.poll_interval),
                None => self.poll_interval,
            };
            cancelled = match signal.wake.wait_timeout(cancelled, slice) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }
}

/// Watch the directory that will hold `path`; `None` falls back to interval polling.
fn watch_parent(path: &Path, signal: Arc<Signal>) -> Option<RecommendedWatcher> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut watcher = match notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
        if event.is_ok() {
            signal.notify();
        }
    }) {
        Ok(watcher) => watcher,
        Err(e) => {
            tracing::debug!(error = %e, "filesystem watcher unavailable, polling");
            return None;
        }
    };

    if let Err(e) = watcher.watch(&dir, RecursiveMode::NonRecursive) {
        tracing::debug!(dir = %dir.display(), error = %e, "cannot watch directory, polling");
        return None;
    }
    Some(watcher)
}
