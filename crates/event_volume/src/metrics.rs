//! Provider statistics: block timings and counters.
//!
//! Feature-gated and runtime-toggled so that a default build records
//! nothing.
//!
//! # Usage
//!
//! ```ignore
//! use event_volume::metrics::COLLECT_METRICS;
//!
//! // Compile with --features metrics
//! // Runtime toggle:
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! let metrics = provider.metrics();
//! println!("avg block: {:.0} us", metrics.sample_timings_us.average());
//! ```

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;

/// Runtime toggle for metrics collection.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Check if metrics collection is enabled (both compile-time and runtime).
#[inline]
pub fn is_enabled() -> bool {
    #[cfg(feature = "metrics")]
    {
        COLLECT_METRICS.load(Ordering::Relaxed)
    }
    #[cfg(not(feature = "metrics"))]
    {
        false
    }
}

/// Fixed-capacity window over the most recent values (e.g., block timings).
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    /// Create a window holding at most `capacity` values.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a new value, evicting the oldest if at capacity.
    ///
    /// A zero-capacity window stays empty.
    pub fn push(&mut self, value: T) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);
    }

    /// Number of values in the window.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the window is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Most recent value.
    pub fn last(&self) -> Option<&T> {
        self.buffer.back()
    }
}

impl RollingWindow<u64> {
    /// Sum of all values.
    pub fn sum(&self) -> u64 {
        self.buffer.iter().sum()
    }

    /// Mean of all values, 0 when empty.
    pub fn average(&self) -> f64 {
        if self.buffer.is_empty() {
            0.0
        } else {
            self.sum() as f64 / self.buffer.len() as f64
        }
    }

    /// Smallest and largest value.
    pub fn min_max(&self) -> Option<(u64, u64)> {
        let min = *self.buffer.iter().min()?;
        let max = *self.buffer.iter().max()?;
        Some((min, max))
    }

    /// Summary statistics of the window.
    pub fn stats(&self) -> TimingStats {
        let (min_us, max_us) = self.min_max().unwrap_or_default();
        TimingStats {
            last_us: self.last().copied().unwrap_or_default(),
            avg_us: self.average().round() as u64,
            min_us,
            max_us,
            sample_count: self.len() as u32,
        }
    }
}

impl Default for RollingWindow<u64> {
    fn default() -> Self {
        Self::new(128) // Last 128 blocks
    }
}

/// Computed statistics of a timing window, in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimingStats {
    pub last_us: u64,
    pub avg_us: u64,
    pub min_us: u64,
    pub max_us: u64,
    /// Values in the window (up to its capacity).
    pub sample_count: u32,
}

/// Per-provider statistics.
#[derive(Debug, Clone, Default)]
pub struct ProviderMetrics {
    /// Wall time of recent block materializations (microseconds).
    pub sample_timings_us: RollingWindow<u64>,
    /// Blocks returned with data.
    pub blocks_sampled: u64,
    /// Blocks that failed and were returned as missing.
    pub blocks_failed: u64,
    /// Calls to `update()`.
    pub updates: u64,
    /// Updates that adopted a new frame range.
    pub frame_range_changes: u64,
}

impl ProviderMetrics {
    /// Record one `sample()` call.
    pub fn record_sample(&mut self, elapsed_us: u64, succeeded: bool) {
        if !is_enabled() {
            return;
        }
        self.sample_timings_us.push(elapsed_us);
        if succeeded {
            self.blocks_sampled += 1;
        } else {
            self.blocks_failed += 1;
        }
    }

    /// Record one `update()` call.
    pub fn record_update(&mut self, changed: bool) {
        if !is_enabled() {
            return;
        }
        self.updates += 1;
        if changed {
            self.frame_range_changes += 1;
        }
    }
}
