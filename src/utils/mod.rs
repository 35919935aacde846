//! Utility modules

pub mod error;

pub use error::{BenchmarkError, ResolutionError, Result};
