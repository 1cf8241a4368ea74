//! Latency summaries and report output (stdout, CSV, JSON)

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

/// Operation being measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    OrderedLookup,
    HashLookup,
    BlobGet,
}

impl Operation {
    pub const ALL: [Operation; 3] = [
        Operation::OrderedLookup,
        Operation::HashLookup,
        Operation::BlobGet,
    ];

    fn label(self) -> &'static str {
        match self {
            Operation::OrderedLookup => "Ordered map lookup",
            Operation::HashLookup => "Hash map lookup",
            Operation::BlobGet => "Blob get",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::OrderedLookup => "ordered_lookup",
            Operation::HashLookup => "hash_lookup",
            Operation::BlobGet => "blob_get",
        };
        f.write_str(name)
    }
}

/// Latency distribution in nanoseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatencySummary {
    pub samples: usize,
    pub mean_ns: f64,
    pub p50_ns: u64,
    pub p90_ns: u64,
    pub p95_ns: u64,
    pub p99_ns: u64,
    pub max_ns: u64,
}

impl LatencySummary {
    /// Sort `samples` in place and compute the distribution.
    pub fn from_samples(samples: &mut [u64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        samples.sort_unstable();
        let n = samples.len();
        let sum: u128 = samples.iter().map(|&s| u128::from(s)).sum();

        Self {
            samples: n,
            mean_ns: sum as f64 / n as f64,
            p50_ns: percentile(samples, 50),
            p90_ns: percentile(samples, 90),
            p95_ns: percentile(samples, 95),
            p99_ns: percentile(samples, 99),
            max_ns: samples[n - 1],
        }
    }
}

/// Nearest-rank style pick on an already sorted, non-empty slice
fn percentile(sorted: &[u64], p: usize) -> u64 {
    let idx = (p * sorted.len()) / 100;
    sorted[idx.min(sorted.len() - 1)]
}

/// One measured operation at one concurrency level
#[derive(Debug, Clone, Serialize)]
pub struct Measurement {
    pub operation: Operation,
    pub concurrency: usize,
    pub latency: LatencySummary,
}

impl Measurement {
    pub fn new(operation: Operation, concurrency: usize, samples: &mut [u64]) -> Self {
        Self {
            operation,
            concurrency,
            latency: LatencySummary::from_samples(samples),
        }
    }
}

/// Everything one benchmark run produced
#[derive(Debug, Serialize)]
pub struct Report {
    pub generated_at: String,
    pub keys: usize,
    pub iterations: usize,
    pub blob_size: usize,
    pub serial: Vec<Measurement>,
    pub concurrent: Vec<Measurement>,
}

impl Report {
    pub fn new(keys: usize, iterations: usize, blob_size: usize) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            keys,
            iterations,
            blob_size,
            serial: Vec::new(),
            concurrent: Vec::new(),
        }
    }

    pub fn print_serial(&self) {
        println!("\nResults:");
        for m in &self.serial {
            print_stats(m.operation.label(), &m.latency);
        }
    }

    pub fn print_concurrent(&self) {
        for m in &self.concurrent {
            println!(
                "{:<20} concurrency={:<3} p50={}ns p90={}ns p95={}ns",
                m.operation.label(),
                m.concurrency,
                m.latency.p50_ns,
                m.latency.p90_ns,
                m.latency.p95_ns
            );
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize report")
    }
}

fn print_stats(label: &str, latency: &LatencySummary) {
    println!("{}:", label);
    println!("  Average: {:.2} ns", latency.mean_ns);
    println!("  P50: {} ns", latency.p50_ns);
    println!("  P90: {} ns", latency.p90_ns);
    println!("  P95: {} ns", latency.p95_ns);
    println!("  P99: {} ns", latency.p99_ns);
}

const CSV_HEADER: &str = "language,implementation,operation,concurrency,p50,p90,p95";

/// Append one row per measurement, writing the header only for a new file.
pub fn append_csv(path: &Path, implementation: &str, rows: &[Measurement]) -> Result<()> {
    let is_new = !path.exists();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

    if is_new {
        writeln!(file, "{}", CSV_HEADER).context("Failed to write CSV header")?;
    }

    for m in rows {
        writeln!(
            file,
            "rust,{},{},{},{},{},{}",
            implementation,
            m.operation,
            m.concurrency,
            m.latency.p50_ns,
            m.latency.p90_ns,
            m.latency.p95_ns
        )
        .context("Failed to write CSV row")?;
    }

    Ok(())
}
