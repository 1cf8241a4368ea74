//! Wall-clock timing for single operations

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Measures elapsed wall time from the moment it was started
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Time elapsed since `start()`
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Run `f` once and return its result together with how long it took
pub fn time<R>(f: impl FnOnce() -> R) -> (R, Duration) {
    let timer = Timer::start();
    let result = f();
    (result, timer.elapsed())
}

/// Most-recent-only latency observation.
///
/// Every `record` overwrites the previous value. Under concurrent writers
/// the surviving value belongs to whichever write landed last; readers see
/// some complete recorded value, never a torn one.
#[derive(Debug, Default)]
pub struct LatencySlot {
    nanos: AtomicU64,
}

impl LatencySlot {
    /// Create an empty slot (reads as zero)
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the slot with `elapsed`
    pub fn record(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.store(nanos, Ordering::Relaxed);
    }

    /// Last recorded value in nanoseconds
    pub fn last_nanos(&self) -> u64 {
        self.nanos.load(Ordering::Relaxed)
    }

    /// Last recorded value
    pub fn last(&self) -> Duration {
        Duration::from_nanos(self.last_nanos())
    }
}
