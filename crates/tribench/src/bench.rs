//! Serial and concurrent benchmark runs

use std::thread;
use std::time::Duration;

use anyhow::{bail, Result};
use tracing::info;
use tricache::{time, Cache};

use crate::report::{Measurement, Operation};

/// Key of the blob every run reads
pub const BLOB_KEY: &str = "test_proto";

/// Workload shape for one run
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub keys: usize,
    pub iterations: usize,
    pub blob_size: usize,
    pub concurrency: Vec<usize>,
}

/// Pre-formatted keys so formatting never shows up inside a measurement
pub struct Workload {
    keys: Vec<String>,
}

impl Workload {
    pub fn new(keys: usize) -> Self {
        Self {
            keys: (0..keys).map(|i| format!("key_{}", i)).collect(),
        }
    }

    fn key(&self, i: usize) -> &str {
        &self.keys[i % self.keys.len()]
    }
}

/// Fill both text stores with `key_i -> value_i` and store the blob
pub fn populate(cache: &Cache, workload: &Workload, blob_size: usize) {
    info!("Populating maps...");
    for (i, key) in workload.keys.iter().enumerate() {
        let value = format!("value_{}", i);
        cache.populate_ordered(key, value.clone());
        cache.populate_hash(key, value);
    }

    let blob: Vec<u8> = (0..blob_size).map(|i| (i % 256) as u8).collect();
    cache.set_blob(BLOB_KEY, blob);
}

/// Whole nanoseconds, saturating at `u64::MAX`
fn nanos(elapsed: Duration) -> u64 {
    nanos(elapsed)
}

/// Run `op` once, return its latency in nanoseconds
fn measure_once(cache: &Cache, workload: &Workload, op: Operation, i: usize) -> u64 {
    let (_, elapsed) = match op {
        Operation::OrderedLookup => time(|| cache.lookup_ordered(workload.key(i))),
        Operation::HashLookup => time(|| cache.lookup_hash(workload.key(i))),
        Operation::BlobGet => time(|| cache.get_blob(BLOB_KEY)),
    };
    nanos(elapsed)
}

/// Single-threaded run. Text lookups are timed by the cache's own latency
/// slots; blob reads are timed around the call.
pub fn run_serial(cache: &Cache, workload: &Workload, iterations: usize) -> Vec<Measurement> {
    let mut results = Vec::with_capacity(Operation::ALL.len());

    info!("Benchmarking ordered map lookups...");
    let mut samples = Vec::with_capacity(iterations);
    for i in 0..iterations {
        cache.lookup_ordered(workload.key(i));
        samples.push(nanos(cache.ordered_lookup_latency()));
    }
    results.push(Measurement::new(Operation::OrderedLookup, 1, &mut samples));

    info!("Benchmarking hash map lookups...");
    samples.clear();
    for i in 0..iterations {
        cache.lookup_hash(workload.key(i));
        samples.push(nanos(cache.hash_lookup_latency()));
    }
    results.push(Measurement::new(Operation::HashLookup, 1, &mut samples));

    info!("Benchmarking blob gets...");
    samples.clear();
    for i in 0..iterations {
        samples.push(measure_once(cache, workload, Operation::BlobGet, i));
    }
    results.push(Measurement::new(Operation::BlobGet, 1, &mut samples));

    results
}

/// Run `measure` on `level` scoped threads, `ops_per_thread` times each,
/// and pool the samples. Fails if any worker panicked.
fn sample_threads<F>(level: usize, ops_per_thread: usize, measure: F) -> Result<Vec<u64>>
where
    F: Fn(usize) -> u64 + Sync,
{
    let measure = &measure;
    let joined: Vec<_> = thread::scope(|scope| {
        let workers: Vec<_> = (0..level)
            .map(|t| {
                scope.spawn(move || {
                    (0..ops_per_thread)
                        .map(|i| measure(t * ops_per_thread + i))
                        .collect::<Vec<u64>>()
                })
            })
            .collect();

        workers.into_iter().map(|w| w.join()).collect()
    });

    let mut samples = Vec::with_capacity(level * ops_per_thread);
    for worker in joined {
        match worker {
            Ok(part) => samples.extend(part),
            Err(_) => bail!("benchmark worker panicked at concurrency {}", level),
        }
    }
    Ok(samples)
}

/// For each concurrency level and operation, split `iterations` across that
/// many threads sharing one cache and pool their per-call latencies.
pub fn run_concurrent(
    cache: &Cache,
    workload: &Workload,
    config: &BenchConfig,
) -> Result<Vec<Measurement>> {
    let mut results = Vec::new();

    for &level in &config.concurrency {
        info!("Testing concurrency level: {}", level);
        let ops_per_thread = (config.iterations / level).max(1);

        for op in Operation::ALL {
            let mut samples = sample_threads(level, ops_per_thread, |i| {
                measure_once(cache, workload, op, i)
            })?;
            results.push(Measurement::new(op, level, &mut samples));
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> BenchConfig {
        BenchConfig {
            keys: 50,
            iterations: 200,
            blob_size: 64,
            concurrency: vec![1, 4],
        }
    }

    #[test]
    fn test_populate() {
        let cache = Cache::new();
        let workload = Workload::new(10);

        populate(&cache, &workload, 16);

        assert_eq!(cache.lookup_ordered("key_3").as_deref(), Some(&b"value_3"[..]));
        assert_eq!(cache.lookup_hash("key_9").as_deref(), Some(&b"value_9"[..]));
        let blob = cache.get_blob(BLOB_KEY).unwrap();
        assert_eq!(blob.len(), 16);
        assert_eq!(blob[15], 15);
    }

    #[test]
    fn test_serial_run() {
        let config = small_config();
        let cache = Cache::new();
        let workload = Workload::new(config.keys);
        populate(&cache, &workload, config.blob_size);

        let results = run_serial(&cache, &workload, config.iterations);

        assert_eq!(results.len(), 3);
        for m in &results {
            assert_eq!(m.concurrency, 1);
            assert_eq!(m.latency.samples, config.iterations);
            assert!(m.latency.p50_ns <= m.latency.max_ns);
        }
        assert_eq!(
            cache.stats(tricache::StoreKind::Ordered).hits(),
            config.iterations as u64
        );
    }

    #[test]
    fn test_concurrent_run() {
        let config = small_config();
        let cache = Cache::new();
        let workload = Workload::new(config.keys);
        populate(&cache, &workload, config.blob_size);

        let results = run_concurrent(&cache, &workload, &config).unwrap();

        assert_eq!(results.len(), 2 * Operation::ALL.len());
        let at_four: Vec<_> = results.iter().filter(|m| m.concurrency == 4).collect();
        assert_eq!(at_four.len(), 3);
        for m in at_four {
            assert_eq!(m.latency.samples, 200);
        }
        assert_eq!(cache.stats(tricache::StoreKind::Hash).misses(), 0);
    }

    #[test]
    fn test_worker_panic_fails_the_run() {
        let result = sample_threads(4, 10, |i| {
            if i == 25 {
                panic!("worker failed");
            }
            1
        });

        let err = result.unwrap_err();
        assert!(err.to_string().contains("concurrency 4"));
    }

    #[test]
    fn test_sample_threads_pools_every_worker() {
        let samples = sample_threads(3, 5, |i| i as u64).unwrap();

        assert_eq!(samples.len(), 15);
        assert_eq!(samples.iter().sum::<u64>(), (0..15).sum::<u64>());
    }

    #[test]
    fn test_nanos_saturates() {
        assert_eq!(nanos(Duration::from_nanos(1_500)), 1_500);
        assert_eq!(nanos(Duration::MAX), u64::MAX);
    }
}
