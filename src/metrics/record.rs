//! Emitted metric records
//!
//! The CSV columns are `_time,uuid,type,count,avg_time_ms,interval,info`.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Role of a row in the record stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Start,
    Metric,
    End,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Start => "start",
            RecordKind::Metric => "metric",
            RecordKind::End => "end",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the record stream
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    /// Epoch seconds
    pub timestamp: u64,
    pub run_id: String,
    pub kind: RecordKind,
    pub count: Option<u64>,
    pub latency_ms: Option<f64>,
    pub interval_secs: Option<u64>,
    pub annotation: Option<String>,
}

impl MetricRecord {
    pub const HEADER: [&'static str; 7] = [
        "_time",
        "uuid",
        "type",
        "count",
        "avg_time_ms",
        "interval",
        "info",
    ];

    fn bare(run_id: &str, kind: RecordKind) -> Self {
        Self {
            timestamp: unix_timestamp(),
            run_id: run_id.to_string(),
            kind,
            count: None,
            latency_ms: None,
            interval_secs: None,
            annotation: None,
        }
    }

    pub fn start(run_id: &str, annotation: Option<&str>) -> Self {
        Self {
            annotation: annotation.map(str::to_string),
            ..Self::bare(run_id, RecordKind::Start)
        }
    }

    /// Metric row for one tick window of `interval` that observed `count` lookups
    pub fn metric(run_id: &str, count: u64, interval: Duration) -> Self {
        Self {
            count: Some(count),
            latency_ms: Some(estimate_latency_ms(interval, count)),
            interval_secs: Some(interval.as_secs()),
            ..Self::bare(run_id, RecordKind::Metric)
        }
    }

    pub fn end(run_id: &str) -> Self {
        Self::bare(run_id, RecordKind::End)
    }

    /// Fields in header order; absent values become empty columns
    pub fn to_csv_row(&self) -> [String; 7] {
        [
            self.timestamp.to_string(),
            self.run_id.clone(),
            self.kind.to_string(),
            self.count.map(|c| c.to_string()).unwrap_or_default(),
            self.latency_ms.map(format_latency).unwrap_or_default(),
            self.interval_secs
                .map(|i| i.to_string())
                .unwrap_or_default(),
            self.annotation.clone().unwrap_or_default(),
        ]
    }
}

/// Coarse per-lookup latency: the tick window divided evenly among the lookups
/// completed in it, in milliseconds.
///
/// The window is not divided by the worker count, so with N workers this is
/// closer to inverse throughput than to the latency of a single lookup. A
/// window with zero lookups yields `f64::INFINITY`.
pub fn estimate_latency_ms(interval: Duration, count: u64) -> f64 {
    interval.as_secs_f64() / count as f64 * 1000.0
}

/// Three decimals; non-finite values are written as `+Inf`, `-Inf` or `NaN`
fn format_latency(latency_ms: f64) -> String {
    if latency_ms.is_nan() {
        "NaN".to_string()
    } else if latency_ms.is_infinite() {
        if latency_ms > 0.0 { "+Inf" } else { "-Inf" }.to_string()
    } else {
        format!("{:.3}", latency_ms)
    }
}

/// Current wall-clock time in epoch seconds
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
