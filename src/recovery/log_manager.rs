//! Write-ahead log manager (recovery hook).

use std::sync::atomic::{AtomicU64, Ordering};

/// Allocates log sequence numbers and tracks the durable watermark.
///
/// The buffer pool holds an optional handle to this so the
/// log-before-data interlock (hold back a dirty page whose LSN is past
/// `flushed_lsn`) can be added without touching the pool's API. Record
/// serialization and the recovery protocol live outside this crate.
pub struct LogManager {
    /// Next LSN to hand out; LSN 0 is reserved for "no log record".
    next_lsn: AtomicU64,

    /// Highest LSN known durable on disk.
    flushed_lsn: AtomicU64,
}

impl LogManager {
    /// Create a log manager with an empty log.
    pub fn new() -> Self {
        Self {
            next_lsn: AtomicU64::new(1),
            flushed_lsn: AtomicU64::new(0),
        }
    }

    /// Allocate the next log sequence number.
    pub fn next_lsn(&self) -> u64 {
        self.next_lsn.fetch_add(1, Ordering::Relaxed)
    }

    /// Highest LSN known to be durable.
    pub fn flushed_lsn(&self) -> u64 {
        self.flushed_lsn.load(Ordering::Relaxed)
    }

    /// Advance the durable watermark. The watermark never moves backwards.
    pub fn set_flushed_lsn(&self, lsn: u64) {
        self.flushed_lsn.fetch_max(lsn, Ordering::Relaxed);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}
