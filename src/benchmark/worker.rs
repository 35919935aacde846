//! Lookup worker pool
//!
//! Each worker runs a two-state loop, RUNNING until the stop signal is seen at
//! the top of an iteration, then STOPPED. There is no backoff between lookups.
//! A lookup already in flight is not interrupted, so shutdown latency is one
//! lookup plus one poll interval.
//!
//! Workers never touch the reporter's accumulator; a successful lookup is
//! announced by pushing a unit into the counting channel.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{SendTimeoutError, Sender};
use tracing::{debug, error};

use super::counters::RunCounters;
use super::join_group::{JoinGroup, WorkerRegistration};
use super::resolver::Resolver;
use crate::config::RunConfig;
use crate::utils::BenchmarkError;

/// How long a blocked push waits before re-checking the stop signal
pub const PUSH_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Result from a worker thread
#[derive(Debug, Clone)]
pub struct WorkerResult {
    pub worker_id: usize,
    /// Successful lookups performed by this worker
    pub resolutions: u64,
    /// Units that could not be delivered after the stop signal
    pub dropped: u64,
}

/// Spawns and owns the handles of the lookup workers
pub struct LookupPool {
    config: Arc<RunConfig>,
    resolver: Arc<dyn Resolver>,
    counters: Arc<RunCounters>,
    join_group: Arc<JoinGroup>,
    counts: Sender<u64>,
}

impl LookupPool {
    pub fn new(
        config: Arc<RunConfig>,
        resolver: Arc<dyn Resolver>,
        counters: Arc<RunCounters>,
        join_group: Arc<JoinGroup>,
        counts: Sender<u64>,
    ) -> Self {
        Self {
            config,
            resolver,
            counters,
            join_group,
            counts,
        }
    }

    /// Launch exactly `threads` workers
    ///
    /// A spawn failure aborts the run; handles of the workers already started
    /// are still returned so the caller can join them. The pool's own sender
    /// is dropped here, leaving the workers as the only producers.
    pub fn start(self) -> Vec<JoinHandle<WorkerResult>> {
        let mut handles = Vec::with_capacity(self.config.threads);

        for worker_id in 0..self.config.threads {
            let registration = self.join_group.register();
            let worker = LookupWorker {
                worker_id,
                hostname: self.config.hostname.clone(),
                resolver: Arc::clone(&self.resolver),
                counters: Arc::clone(&self.counters),
                counts: self.counts.clone(),
            };

            let spawned = thread::Builder::new()
                .name(format!("lookup-worker-{}", worker_id))
                .spawn(move || worker.run(registration));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    error!(worker_id, error = %e, "failed to spawn lookup worker");
                    self.counters.abort(BenchmarkError::Worker(format!(
                        "failed to spawn lookup worker {}: {}",
                        worker_id, e
                    )));
                    break;
                }
            }
        }

        debug!(workers = handles.len(), host = %self.config.hostname, "lookup pool started");
        handles
    }
}

struct LookupWorker {
    worker_id: usize,
    hostname: String,
    resolver: Arc<dyn Resolver>,
    counters: Arc<RunCounters>,
    counts: Sender<u64>,
}

impl LookupWorker {
    fn run(self, registration: WorkerRegistration) -> WorkerResult {
        // Drop order: the panic guard fires before the registration is released,
        // so the controller never sees a drained group without the abort.
        let _registration = registration;
        let _guard = AbortOnPanic {
            counters: &self.counters,
            worker_id: self.worker_id,
        };

        let mut result = WorkerResult {
            worker_id: self.worker_id,
            resolutions: 0,
            dropped: 0,
        };

        while !self.counters.is_shutdown() {
            if let Err(e) = self.resolver.resolve(&self.hostname) {
                error!(worker_id = self.worker_id, error = %e, "lookup failed, aborting run");
                self.counters.abort(e.into());
                break;
            }

            self.counters.record_resolution();
            result.resolutions += 1;

            if !self.push_count() {
                result.dropped += 1;
                break;
            }
        }

        debug!(
            worker_id = self.worker_id,
            resolutions = result.resolutions,
            "lookup worker stopped"
        );
        result
    }

    /// Push one unit, re-checking the stop signal while the channel is full.
    /// Returns false if the unit was not delivered.
    fn push_count(&self) -> bool {
        loop {
            match self.counts.send_timeout(1, PUSH_POLL_INTERVAL) {
                Ok(()) => return true,
                Err(SendTimeoutError::Timeout(_)) => {
                    if self.counters.is_shutdown() {
                        return false;
                    }
                }
                Err(SendTimeoutError::Disconnected(_)) => return false,
            }
        }
    }
}

struct AbortOnPanic<'a> {
    counters: &'a RunCounters,
    worker_id: usize,
}

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.counters.abort(BenchmarkError::Worker(format!(
                "lookup worker {} panicked",
                self.worker_id
            )));
        }
    }
}
