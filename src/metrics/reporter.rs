//! Metrics reporter - start/metric/end rows and the aggregation loop
//!
//! The accumulator lives only on the reporter thread. Workers feed it through
//! the counting channel; a tick turns the accumulated count into a metric row
//! and resets it to zero in the same step, so no count is lost or reported
//! twice.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::select;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use super::record::MetricRecord;
use super::sink::RecordSink;
use crate::benchmark::{JoinGroup, RunCounters};
use crate::config::RunConfig;
use crate::utils::{BenchmarkError, Result};

/// Granularity of the deadline wait
pub const DEADLINE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Totals kept by the aggregation loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Metric rows emitted
    pub ticks: u64,
    /// Sum of `count` over all metric rows
    pub reported: u64,
    /// Counts received after the last tick, never reported
    pub unreported: u64,
}

/// Outcome of a completed report
#[derive(Debug, Clone)]
pub struct ReportSummary {
    pub loop_stats: LoopStats,
    /// Data rows written, start and end included
    pub records_written: u64,
}

pub struct Reporter {
    config: Arc<RunConfig>,
    sink: Arc<RecordSink>,
    counters: Arc<RunCounters>,
    join_group: Arc<JoinGroup>,
    counts: Option<Receiver<u64>>,
    finalize: Option<Sender<()>>,
    loop_handle: Option<JoinHandle<LoopStats>>,
}

impl Reporter {
    pub fn new(
        config: Arc<RunConfig>,
        sink: Arc<RecordSink>,
        counters: Arc<RunCounters>,
        join_group: Arc<JoinGroup>,
        counts: Receiver<u64>,
    ) -> Self {
        Self {
            config,
            sink,
            counters,
            join_group,
            counts: Some(counts),
            finalize: None,
            loop_handle: None,
        }
    }

    /// Write the header and the start record
    pub fn start(&self) -> Result<()> {
        self.sink.write_header()?;
        self.sink.write(&MetricRecord::start(
            &self.config.run_id,
            self.config.info.as_deref(),
        ))?;
        debug!(run_id = %self.config.run_id, "start record written");
        Ok(())
    }

    /// Launch the aggregation loop on its own thread.
    ///
    /// Ticks fall at `started + k * interval`, measured from the same instant
    /// the controller derives its deadline from.
    pub fn writer_loop(&mut self, started: Instant) -> Result<()> {
        let counts = self.counts.take().ok_or_else(|| {
            BenchmarkError::Worker("reporter loop already started".to_string())
        })?;
        let (finalize_tx, finalize_rx) = channel::bounded::<()>(0);

        let aggregator = Aggregator {
            run_id: self.config.run_id.clone(),
            interval: self.config.interval,
            epoch: started,
            deadline: started + self.config.duration,
            sink: Arc::clone(&self.sink),
            counters: Arc::clone(&self.counters),
            counts,
            finalize: finalize_rx,
        };

        let handle = thread::Builder::new()
            .name("reporter".to_string())
            .spawn(move || aggregator.run())
            .map_err(|e| BenchmarkError::Worker(format!("failed to spawn reporter: {}", e)))?;

        self.finalize = Some(finalize_tx);
        self.loop_handle = Some(handle);
        Ok(())
    }

    /// Block until `deadline` or until the run is aborted
    pub fn wait_for_deadline(&self, deadline: Instant) {
        let progress = self.progress_bar();
        let started = Instant::now();
        let mut last_count = self.counters.resolutions();
        let mut last_time = started;

        while !self.counters.is_shutdown() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }

            progress.set_position(started.elapsed().as_secs());
            let window = now.duration_since(last_time).as_secs_f64();
            if window >= 1.0 {
                let count = self.counters.resolutions();
                progress.set_message(format!(
                    "{:.0} lookups/s, total: {}",
                    (count - last_count) as f64 / window,
                    count
                ));
                last_count = count;
                last_time = now;
            }

            thread::sleep(DEADLINE_POLL_INTERVAL.min(deadline - now));
        }

        progress.finish_and_clear();
    }

    /// Stop and drain the workers, stop the loop and write the end record.
    ///
    /// Call after [`Reporter::wait_for_deadline`]. The end record is only
    /// written once the join group is empty, so no worker can push a count
    /// after it. An aborted run returns its fatal error and writes no end
    /// record.
    pub fn finish(mut self) -> Result<ReportSummary> {
        self.counters.signal_shutdown();
        debug!(live = self.join_group.live(), "waiting for lookup workers");
        self.join_group.wait();

        // Disconnecting the finalize channel wakes the loop without waiting for a tick
        drop(self.finalize.take());
        let loop_stats = match self.loop_handle.take() {
            Some(handle) => handle.join().map_err(|_| {
                BenchmarkError::Worker("reporter loop panicked".to_string())
            })?,
            None => LoopStats::default(),
        };

        if let Some(err) = self.counters.take_fatal() {
            warn!("run aborted, end record not written");
            return Err(err);
        }

        if loop_stats.unreported > 0 {
            debug!(
                unreported = loop_stats.unreported,
                "lookups after the last tick are not reported"
            );
        }

        self.sink.close_with(&MetricRecord::end(&self.config.run_id))?;
        info!(
            metric_rows = loop_stats.ticks,
            reported = loop_stats.reported,
            "end record written"
        );

        Ok(ReportSummary {
            loop_stats,
            records_written: self.sink.records_written(),
        })
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.config.show_progress() {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(self.config.duration.as_secs());
        match ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}s/{len}s | {msg}",
        ) {
            Ok(style) => pb.set_style(style.progress_chars("#>-")),
            Err(e) => debug!(error = %e, "invalid progress template"),
        }
        pb
    }
}

/// State owned by the aggregation thread
struct Aggregator {
    run_id: String,
    interval: Duration,
    epoch: Instant,
    deadline: Instant,
    sink: Arc<RecordSink>,
    counters: Arc<RunCounters>,
    counts: Receiver<u64>,
    finalize: Receiver<()>,
}

impl Aggregator {
    /// Ticks due at or before the deadline are written even when the stop
    /// signal is already raised; later ticks are never written.
    fn run(self) -> LoopStats {
        let mut next_tick = self.epoch + self.interval;
        let mut ticker = channel::at(next_tick);
        let mut counts = self.counts.clone();
        let mut finalize = self.finalize.clone();
        let mut observed = 0u64;
        let mut stats = LoopStats::default();

        loop {
            if self.counters.is_aborted() {
                break;
            }
            if self.counters.is_shutdown() && next_tick > self.deadline {
                break;
            }

            let mut ticked = false;
            let mut counts_closed = false;
            let mut finalized = false;

            select! {
                recv(ticker) -> _ => {
                    // Take whatever was queued before the tick fired
                    observed += counts.try_iter().sum::<u64>();
                    let record = MetricRecord::metric(&self.run_id, observed, self.interval);
                    if let Err(e) = self.sink.write(&record) {
                        self.counters.abort(e);
                        break;
                    }
                    debug!(count = observed, latency_ms = ?record.latency_ms, "metric record written");
                    stats.ticks += 1;
                    stats.reported += observed;
                    observed = 0;
                    ticked = true;
                }
                recv(counts) -> msg => match msg {
                    Ok(n) => observed += n,
                    Err(_) => counts_closed = true,
                },
                recv(finalize) -> _ => finalized = true,
            }

            if ticked {
                next_tick += self.interval;
                ticker = channel::at(next_tick);
            }
            // A closed receiver is always ready; park it so the pending tick can fire
            if counts_closed {
                counts = channel::never();
            }
            if finalized {
                finalize = channel::never();
            }
        }

        // Drain what is already queued so the residue is accounted for
        observed += self.counts.try_iter().sum::<u64>();
        stats.unreported = observed;
        stats
    }
}
