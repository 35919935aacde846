//! Run configuration derived from CLI arguments

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use super::cli::CliArgs;
use crate::utils::{BenchmarkError, Result};

/// Default CSV file written when no output is given
pub const DEFAULT_OUTPUT: &str = "dnsbench.csv";

/// Where emitted records go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    /// "-" selects stdout, anything else is a file path
    pub fn parse(value: &str) -> Self {
        if value == "-" {
            OutputTarget::Stdout
        } else {
            OutputTarget::File(PathBuf::from(value))
        }
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::Stdout => write!(f, "<stdout>"),
            OutputTarget::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Immutable parameters of a single run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub hostname: String,
    pub threads: usize,
    pub interval: Duration,
    pub duration: Duration,
    pub info: Option<String>,
    pub output: OutputTarget,
    /// Generated once per process, stable for the run's lifetime
    pub run_id: String,
    pub quiet: bool,
    pub verbose: bool,
}

impl RunConfig {
    pub fn new(
        hostname: impl Into<String>,
        threads: usize,
        interval: Duration,
        duration: Duration,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            threads,
            interval,
            duration,
            info: None,
            output: OutputTarget::File(PathBuf::from(DEFAULT_OUTPUT)),
            run_id: uuid::Uuid::new_v4().to_string(),
            quiet: false,
            verbose: false,
        }
    }

    /// Create configuration from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self> {
        args.validate().map_err(BenchmarkError::Config)?;

        let mut config = Self::new(
            args.hostname.trim(),
            args.threads,
            Duration::from_secs(args.interval_secs),
            Duration::from_secs(args.duration_secs),
        );
        config.info = args.info.clone().filter(|s| !s.is_empty());
        config.output = OutputTarget::parse(&args.output);
        config.quiet = args.quiet;
        config.verbose = args.verbose;

        config.validate()?;
        Ok(config)
    }

    /// Check invariants the run controller relies on
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(BenchmarkError::Config(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.interval.is_zero() {
            return Err(BenchmarkError::Config(
                "report interval must be positive".to_string(),
            ));
        }
        if self.duration.is_zero() {
            return Err(BenchmarkError::Config(
                "run duration must be positive".to_string(),
            ));
        }
        if self.hostname.is_empty() {
            return Err(BenchmarkError::Config("hostname must not be empty".to_string()));
        }
        Ok(())
    }

    /// Interval as written to the `interval` column
    pub fn interval_secs(&self) -> u64 {
        self.interval.as_secs()
    }

    /// Progress bar is drawn only when it cannot corrupt the record stream
    pub fn show_progress(&self) -> bool {
        !self.quiet && self.output != OutputTarget::Stdout
    }
}
