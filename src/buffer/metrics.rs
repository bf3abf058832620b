//! Buffer pool metrics.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Event counters kept by the buffer pool.
///
/// One counter per pool event, mirroring the events the pool logs:
/// fetch hits and misses, evictions, write-backs (dirty pages written
/// while reclaiming a frame), flushes (pages written on request), and
/// deletes. A miss always implies one disk read, so reads are not
/// counted separately.
///
/// Counters are atomic and relaxed: they need atomicity, not ordering
/// against each other. The pool records events internally; readers take
/// a [`snapshot`](PoolMetrics::snapshot).
#[derive(Debug, Default)]
pub struct PoolMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    writebacks: AtomicU64,
    flushes: AtomicU64,
    deletes: AtomicU64,
}

impl PoolMetrics {
    /// Create a metrics block with every counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_writeback(&self) {
        self.writebacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    /// Share of fetches served without disk I/O, in `[0.0, 1.0]`.
    pub fn hit_ratio(&self) -> f64 {
        self.snapshot().hit_ratio()
    }

    /// Take a non-atomic copy for display or comparison.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            writebacks: self.writebacks.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
        }
    }

    /// Zero every counter.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.writebacks.store(0, Ordering::Relaxed);
        self.flushes.store(0, Ordering::Relaxed);
        self.deletes.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time copy of the pool's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub writebacks: u64,
    pub flushes: u64,
    pub deletes: u64,
}

impl MetricsSnapshot {
    /// Share of fetches served without disk I/O, in `[0.0, 1.0]`.
    pub fn hit_ratio(&self) -> f64 {
        let fetches = self.hits + self.misses;
        if fetches == 0 {
            0.0
        } else {
            self.hits as f64 / fetches as f64
        }
    }

    /// Total pages written to disk, whatever the trigger.
    pub fn disk_writes(&self) -> u64 {
        self.writebacks + self.flushes
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hits / {} misses ({:.1}% hit ratio), {} evictions, {} writebacks, {} flushes",
            self.hits,
            self.misses,
            self.hit_ratio() * 100.0,
            self.evictions,
            self.writebacks,
            self.flushes,
        )
    }
}
