//! Metrics records and reporting
//!
//! This module provides:
//! - The start/metric/end record model and the latency estimate
//! - A lock-guarded CSV sink shared by every emitting thread
//! - The reporter that drains the counting channel on a fixed tick

pub mod record;
pub mod reporter;
pub mod sink;

pub use record::{estimate_latency_ms, unix_timestamp, MetricRecord, RecordKind};
pub use reporter::{LoopStats, ReportSummary, Reporter};
pub use sink::RecordSink;
