//! Error types for dnsbench
//!
//! Every variant is fatal to the run. A failed lookup voids the measurement
//! instead of being counted as a failure.

use std::io;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum BenchmarkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Record sink already closed")]
    SinkClosed,

    #[error("Worker error: {0}")]
    Worker(String),
}

/// Lookup failures reported by a resolver
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("Failed to resolve {host}: {source}")]
    LookupFailed { host: String, source: io::Error },

    #[error("No addresses returned for {0}")]
    NoAddresses(String),
}

pub type Result<T> = std::result::Result<T, BenchmarkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_error_message() {
        let err = BenchmarkError::from(ResolutionError::LookupFailed {
            host: "example.invalid".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such host"),
        });
        assert_eq!(
            err.to_string(),
            "Resolution error: Failed to resolve example.invalid: no such host"
        );
    }

    #[test]
    fn test_config_error_message() {
        let err = BenchmarkError::Config("--threads must be at least 1".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: --threads must be at least 1"
        );
    }
}
