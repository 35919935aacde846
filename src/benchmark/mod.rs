//! Benchmark orchestration and workers
//!
//! This module provides the multi-threaded lookup benchmark:
//! - RunCounters: stop signal, abort slot and lookup totals
//! - JoinGroup: live-worker tracking for the drain
//! - LookupPool: workers hammering the resolver
//! - RunController: coordinates the run lifecycle

pub mod counters;
pub mod join_group;
pub mod orchestrator;
pub mod resolver;
pub mod worker;

pub use counters::RunCounters;
pub use join_group::{JoinGroup, WorkerRegistration};
pub use orchestrator::{format_count, RunController, RunState, RunSummary, COUNT_CHANNEL_CAPACITY};
pub use resolver::{Resolver, SystemResolver};
pub use worker::{LookupPool, WorkerResult};
