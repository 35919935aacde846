//! Run controller
//!
//! Coordinates the lifecycle of one run: starts the reporter, then the lookup
//! workers, waits for the deadline, stops and drains the workers and lets the
//! reporter close out the record stream.
//!
//! Run states advance strictly `Init -> Running -> Draining -> Done`. The
//! drain starts at the deadline or as soon as a worker aborts the run; `Done`
//! is only reached once every worker has exited and the end record is written.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel;
use tracing::{debug, info};

use super::counters::RunCounters;
use super::join_group::JoinGroup;
use super::resolver::{Resolver, SystemResolver};
use super::worker::{LookupPool, WorkerResult};
use crate::config::RunConfig;
use crate::metrics::{RecordSink, Reporter};
use crate::utils::Result;

/// Capacity of the counting channel between workers and the reporter
pub const COUNT_CHANNEL_CAPACITY: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Running,
    Draining,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Init => "init",
            RunState::Running => "running",
            RunState::Draining => "draining",
            RunState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Totals of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    /// Successful lookups across all workers
    pub resolutions: u64,
    /// Lookups covered by metric rows
    pub reported: u64,
    pub metric_rows: u64,
    pub records_written: u64,
    pub elapsed: Duration,
    pub workers: Vec<WorkerResult>,
}

impl RunSummary {
    /// Average lookups per second over the whole run
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.resolutions as f64 / secs
        } else {
            0.0
        }
    }
}

pub struct RunController {
    config: Arc<RunConfig>,
    resolver: Arc<dyn Resolver>,
    sink: Arc<RecordSink>,
    state: RunState,
}

impl RunController {
    /// Controller using the system resolver and the configured output
    pub fn new(config: RunConfig) -> Result<Self> {
        config.validate()?;
        let sink = RecordSink::open(&config.output)?;
        Ok(Self::with_parts(config, Arc::new(SystemResolver::new()), sink))
    }

    pub fn with_parts(config: RunConfig, resolver: Arc<dyn Resolver>, sink: RecordSink) -> Self {
        Self {
            config: Arc::new(config),
            resolver,
            sink: Arc::new(sink),
            state: RunState::Init,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Execute the run; any component failure is returned as the run's error
    pub fn run(&mut self) -> Result<RunSummary> {
        let counters = Arc::new(RunCounters::new());
        let join_group = Arc::new(JoinGroup::new());
        let (counts_tx, counts_rx) = channel::bounded(COUNT_CHANNEL_CAPACITY);

        let started = Instant::now();
        let deadline = started + self.config.duration;

        let mut reporter = Reporter::new(
            Arc::clone(&self.config),
            Arc::clone(&self.sink),
            Arc::clone(&counters),
            Arc::clone(&join_group),
            counts_rx,
        );
        reporter.start()?;
        reporter.writer_loop(started)?;

        let handles = LookupPool::new(
            Arc::clone(&self.config),
            Arc::clone(&self.resolver),
            Arc::clone(&counters),
            Arc::clone(&join_group),
            counts_tx,
        )
        .start();
        self.enter(RunState::Running);
        info!(
            run_id = %self.config.run_id,
            host = %self.config.hostname,
            threads = self.config.threads,
            duration_secs = self.config.duration.as_secs(),
            "benchmark running"
        );

        reporter.wait_for_deadline(deadline);
        self.enter(RunState::Draining);
        let report = reporter.finish();

        // Every worker has deregistered by now, so these joins do not block
        let workers: Vec<WorkerResult> = handles.into_iter().filter_map(|h| h.join().ok()).collect();
        let report = report?;
        self.enter(RunState::Done);

        Ok(RunSummary {
            run_id: self.config.run_id.clone(),
            resolutions: counters.resolutions(),
            reported: report.loop_stats.reported,
            metric_rows: report.loop_stats.ticks,
            records_written: report.records_written,
            elapsed: started.elapsed(),
            workers,
        })
    }

    fn enter(&mut self, next: RunState) {
        debug!(from = %self.state, to = %next, "run state");
        self.state = next;
    }
}

/// Format large numbers with thousands separators
/// Examples: 1,234,567 or 987,654
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
