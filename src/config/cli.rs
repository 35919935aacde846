//! Command-line argument parsing

use clap::Parser;

/// Benchmark DNS resolution throughput for a single hostname
#[derive(Parser, Debug, Clone)]
#[command(name = "dnsbench")]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    /// CSV output file ("-" writes records to stdout)
    #[arg(short = 'o', long = "output", default_value = "dnsbench.csv")]
    pub output: String,

    /// Number of lookup threads
    #[arg(short = 't', long = "threads", default_value_t = 1)]
    pub threads: usize,

    /// Reporting interval in seconds
    #[arg(short = 'i', long = "interval", default_value_t = 5)]
    pub interval_secs: u64,

    /// Hostname to look up
    #[arg(short = 'n', long = "hostname", default_value = "google.com")]
    pub hostname: String,

    /// Free-text information added to the start record
    #[arg(short = 'm', long = "info")]
    pub info: Option<String>,

    /// Quiet mode (errors only, no progress bar)
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,

    /// Verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Duration in seconds to run the test
    #[arg(value_name = "DURATION")]
    pub duration_secs: u64,
}

impl CliArgs {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate argument values
    pub fn validate(&self) -> Result<(), String> {
        if self.threads == 0 {
            return Err("--threads must be at least 1".to_string());
        }
        if self.interval_secs == 0 {
            return Err("--interval must be at least 1 second".to_string());
        }
        if self.duration_secs == 0 {
            return Err("<duration> must be at least 1 second".to_string());
        }
        if self.hostname.trim().is_empty() {
            return Err("--hostname must not be empty".to_string());
        }
        if self.output.is_empty() {
            return Err("--output must not be empty".to_string());
        }
        Ok(())
    }
}
