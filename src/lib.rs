//! dnsbench library
//!
//! Resolves one hostname from concurrent workers for a fixed duration and
//! reports lookup counts per interval as CSV.

pub mod benchmark;
pub mod config;
pub mod metrics;
pub mod utils;
