//! Shared run signals
//!
//! These are the only synchronization points between lookup workers, the
//! reporter loop and the run controller apart from the counting channel.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::utils::BenchmarkError;

/// Signals and totals shared between all run threads
///
/// `shutdown` is write-once: it goes from false to true and is never reset.
/// The release store pairs with acquire loads so every poller observes the
/// transition on its next check.
pub struct RunCounters {
    /// Successful resolutions across all workers
    resolutions: AtomicU64,

    /// Stop signal
    shutdown: AtomicBool,

    /// Set when a fatal error ended the run early
    aborted: AtomicBool,

    /// First fatal error raised by any thread
    fatal: Mutex<Option<BenchmarkError>>,
}

impl RunCounters {
    pub fn new() -> Self {
        Self {
            resolutions: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
            aborted: AtomicBool::new(false),
            fatal: Mutex::new(None),
        }
    }

    /// Record one successful lookup
    #[inline]
    pub fn record_resolution(&self) {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
    }

    /// Total successful lookups so far
    pub fn resolutions(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    /// Signal shutdown to all pollers
    pub fn signal_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Check if shutdown has been signaled
    #[inline]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Fail the run. Only the first error is kept; shutdown is raised as well.
    pub fn abort(&self, err: BenchmarkError) {
        {
            let mut slot = self.fatal.lock();
            if slot.is_none() {
                *slot = Some(err);
            }
        }
        self.aborted.store(true, Ordering::Release);
        self.signal_shutdown();
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    /// Take the fatal error, if any thread raised one
    pub fn take_fatal(&self) -> Option<BenchmarkError> {
        self.fatal.lock().take()
    }
}

impl Default for RunCounters {
    fn default() -> Self {
        Self::new()
    }
}
