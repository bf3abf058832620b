//! LatchDB - the buffer-pool core of a disk-backed storage engine.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │            Storage clients (heap, index, catalog)           │
//! │            fetch / new_page / unpin / flush / delete        │
//! └──────────────────────────────┬──────────────────────────────┘
//!                                ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Buffer Pool (buffer/)                       │
//! │   ┌─────────────────────────────────────────────────┐       │
//! │   │   Eviction Policies: LRU (default) | FIFO       │       │
//! │   │          (swappable at construction)            │       │
//! │   └─────────────────────────────────────────────────┘       │
//! │      BufferPoolManager + Frame + Guards + Metrics           │
//! └──────────────────────────────┬──────────────────────────────┘
//!                                ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Storage Layer (storage/)                     │
//! │            DiskManager + Page       recovery/: WAL hook     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The pool guarantees that a pinned page is never evicted, that dirty
//! pages are written back before their frame is reused, and that the
//! page-table, free list, and eviction candidates stay consistent under
//! concurrent use.
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FrameId, Error, config)
//! - [`buffer`] - Buffer pool management and eviction policies
//! - [`storage`] - Disk I/O and the raw page type
//! - [`recovery`] - Write-ahead logging hooks
//!
//! # Quick Start
//! ```no_run
//! use latchdb::{BufferPoolManager, DiskManager};
//!
//! let dm = DiskManager::create("my_database.db").unwrap();
//! let bpm = BufferPoolManager::new(64, dm);
//!
//! // Allocate a page, write to it, let the guard unpin it.
//! let page_id = {
//!     let mut guard = bpm.new_page().unwrap();
//!     guard.as_mut_slice()[0] = 0xAB;
//!     guard.page_id()
//! };
//!
//! // Read it back (cache hit).
//! let guard = bpm.fetch_page_read(page_id).unwrap();
//! assert_eq!(guard.as_slice()[0], 0xAB);
//! ```

pub mod buffer;
pub mod common;
pub mod recovery;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{Error, FrameId, PageId, Result};

pub use buffer::replacer::{FifoReplacer, LruReplacer, Replacer};
pub use buffer::{
    BufferPoolManager, Frame, MetricsSnapshot, PageReadGuard, PageWriteGuard, PoolMetrics,
};
pub use recovery::LogManager;
pub use storage::{DiskManager, Page};
