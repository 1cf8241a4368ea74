//! tricache benchmark driver

mod bench;
mod report;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::info;
use tricache::Cache;

use crate::bench::{populate, run_concurrent, run_serial, BenchConfig, Workload};
use crate::report::{append_csv, Report};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of distinct keys in each text store
    #[arg(short, long, default_value_t = 10_000)]
    keys: usize,

    /// Lookups per operation (split across threads in concurrent runs)
    #[arg(short, long, default_value_t = 100_000)]
    iterations: usize,

    /// Size of the benchmark blob in bytes
    #[arg(short, long, default_value_t = 1024)]
    blob_size: usize,

    /// Comma-separated thread counts for the concurrent run
    #[arg(short, long, value_delimiter = ',', default_value = "1,2,4,8,16")]
    concurrency: Vec<usize>,

    /// Append concurrent results to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,

    /// Only run the concurrent benchmark
    #[arg(long)]
    skip_serial: bool,
}

/// Where and how results are written
#[derive(Debug, Default, PartialEq)]
struct OutputOptions {
    csv: Option<PathBuf>,
    json: bool,
    skip_serial: bool,
}

impl Args {
    fn into_config(self) -> Result<(BenchConfig, OutputOptions)> {
        if self.keys == 0 {
            bail!("--keys must be greater than 0");
        }
        if self.iterations == 0 {
            bail!("--iterations must be greater than 0");
        }
        if self.concurrency.iter().any(|&level| level == 0) {
            bail!("--concurrency levels must be greater than 0");
        }

        let config = BenchConfig {
            keys: self.keys,
            iterations: self.iterations,
            blob_size: self.blob_size,
            concurrency: self.concurrency,
        };
        let output = OutputOptions {
            csv: self.csv,
            json: self.json,
            skip_serial: self.skip_serial,
        };
        Ok((config, output))
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let (config, output) = Args::parse().into_config()?;

    info!("Starting tribench v{}", env!("CARGO_PKG_VERSION"));
    info!(
        keys = config.keys,
        iterations = config.iterations,
        blob_size = config.blob_size,
        "Benchmark configuration"
    );

    let cache = Cache::new();
    let workload = Workload::new(config.keys);
    populate(&cache, &workload, config.blob_size);

    let mut report = Report::new(config.keys, config.iterations, config.blob_size);

    if !output.skip_serial {
        println!("=== Serial Benchmarks ===");
        report.serial = run_serial(&cache, &workload, config.iterations);
        report.print_serial();
    }

    println!("\n=== Concurrent Benchmarks ===");
    report.concurrent = run_concurrent(&cache, &workload, &config)?;
    report.print_concurrent();

    if let Some(path) = &output.csv {
        append_csv(path, "tricache", &report.concurrent)?;
        info!("Results written to {}", path.display());
    }

    if output.json {
        println!("{}", report.to_json()?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["tribench"]).unwrap();
        assert_eq!(args.keys, 10_000);
        assert_eq!(args.iterations, 100_000);
        assert_eq!(args.concurrency, vec![1, 2, 4, 8, 16]);
        assert!(args.csv.is_none());
    }

    #[test]
    fn test_args_concurrency_list() {
        let args = Args::try_parse_from(["tribench", "--concurrency", "2,3", "--json"]).unwrap();
        assert_eq!(args.concurrency, vec![2, 3]);
        assert!(args.json);
    }

    #[test]
    fn test_zero_level_rejected() {
        let args = Args::try_parse_from(["tribench", "-c", "1,0"]).unwrap();
        assert!(args.into_config().is_err());
    }

    #[test]
    fn test_output_flags_map_to_their_fields() {
        let args = Args::try_parse_from(["tribench", "--skip-serial"]).unwrap();
        let (_, output) = args.into_config().unwrap();
        assert_eq!(
            output,
            OutputOptions {
                csv: None,
                json: false,
                skip_serial: true,
            }
        );

        let args =
            Args::try_parse_from(["tribench", "--json", "--csv", "out.csv"]).unwrap();
        let (config, output) = args.into_config().unwrap();
        assert!(output.json);
        assert!(!output.skip_serial);
        assert_eq!(output.csv, Some(PathBuf::from("out.csv")));
        assert_eq!(config.concurrency, vec![1, 2, 4, 8, 16]);
    }
}
