//! dnsbench - DNS resolution throughput benchmark
//!
//! Hammers a hostname lookup from concurrent workers for a fixed duration and
//! writes start/metric/end records as CSV.

use anyhow::Result;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use dnsbench::benchmark::{format_count, RunController, RunSummary};
use dnsbench::config::{CliArgs, RunConfig};

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

// Banner and summary go to stderr: stdout may be carrying the record stream.
fn print_banner(config: &RunConfig) {
    if config.quiet {
        return;
    }

    eprintln!("dnsbench v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("====================================");
    eprintln!("Host: {}", config.hostname);
    eprintln!(
        "Threads: {}, Interval: {}s, Duration: {}s",
        config.threads,
        config.interval.as_secs(),
        config.duration.as_secs()
    );
    eprintln!("Output: {}", config.output);
    eprintln!("Run id: {}", config.run_id);
    eprintln!("====================================\n");
}

fn print_summary(config: &RunConfig, summary: &RunSummary) {
    if config.quiet {
        return;
    }

    eprintln!("\n====================================");
    eprintln!("BENCHMARK COMPLETE");
    eprintln!("====================================");
    eprintln!("Total lookups: {}", format_count(summary.resolutions));
    eprintln!("Reported lookups: {}", format_count(summary.reported));
    eprintln!("Metric rows: {}", summary.metric_rows);
    eprintln!("Elapsed: {:.2}s", summary.elapsed.as_secs_f64());
    eprintln!(
        "Throughput: {} lookups/s",
        format_count(summary.throughput() as u64)
    );
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse_args();

    setup_logging(args.verbose, args.quiet);

    let config = RunConfig::from_cli(&args)?;
    print_banner(&config);

    let mut controller = RunController::new(config.clone())?;
    let summary = controller.run()?;

    info!(run_id = %summary.run_id, records = summary.records_written, "records written to {}", config.output);
    print_summary(&config, &summary);

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
