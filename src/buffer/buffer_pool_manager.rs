//! Buffer Pool Manager - the core page caching layer.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between disk and memory
//! - Pin-based reference counting
//! - Automatic dirty page write-back on eviction
//! - Pluggable eviction policies

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace, warn};
use parking_lot::Mutex;

use crate::buffer::replacer::{LruReplacer, Replacer};
use crate::buffer::{Frame, PageReadGuard, PageWriteGuard, PoolMetrics};
use crate::common::{Error, FrameId, PageId, Result};
use crate::recovery::LogManager;
use crate::storage::DiskManager;

/// State behind the pool latch.
///
/// Every frame id is in exactly one of `free_list` or `page_table`'s
/// values; `|page_table| + |free_list|` always equals the pool size.
struct PoolInner {
    /// Maps resident page ids to their frames.
    page_table: HashMap<PageId, FrameId>,

    /// Frames holding no page (LIFO for cache locality).
    free_list: Vec<FrameId>,
}

/// Manages a fixed pool of frames caching disk pages.
///
/// # Architecture
/// ```text
/// ┌────────────────────────────────────────────────────────────┐
/// │                   BufferPoolManager                        │
/// │  ┌───────────── latch ─────────────┐                       │
/// │  │ page_table: PageId → FrameId    │  frames: Vec<Frame>   │
/// │  │ free_list:  Vec<FrameId>        │  [F0] [F1] [F2] ...   │
/// │  └─────────────────────────────────┘                       │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
/// │  │   replacer   │  │ disk_manager │  │ log_manager  │      │
/// │  │ dyn Replacer │  │    Mutex     │  │  (optional)  │      │
/// │  └──────────────┘  └──────────────┘  └──────────────┘      │
/// └────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// One coarse `latch` makes every public operation a single critical
/// section over the page table, the free list, frame metadata, and the
/// replacer; disk I/O runs while it is held. Page *data* sits behind
/// per-frame `RwLock`s taken after the latch is released, so pinned
/// clients never contend with the pool. Lock order is strictly
/// `latch → frame data`; guards release their data lock before unpinning.
///
/// # Usage
/// ```ignore
/// let dm = DiskManager::create("test.db")?;
/// let bpm = BufferPoolManager::new(10, dm);
///
/// let mut guard = bpm.new_page()?;
/// let pid = guard.page_id();
/// guard.as_mut_slice()[0] = 0xAB;
/// drop(guard); // dirty, unpinned
///
/// let guard = bpm.fetch_page_read(pid)?;
/// ```
pub struct BufferPoolManager {
    /// Fixed pool of frames allocated at startup.
    frames: Vec<Frame>,

    /// The single latch serializing pool bookkeeping.
    latch: Mutex<PoolInner>,

    /// Eviction policy choosing victims among unpinned resident frames.
    replacer: Box<dyn Replacer>,

    /// Handles all disk I/O.
    disk_manager: Mutex<DiskManager>,

    /// Write-ahead log handle. Held for the future WAL-before-write
    /// interlock on dirty write-back; not consulted yet.
    log_manager: Option<Arc<LogManager>>,

    /// Event counters.
    metrics: PoolMetrics,

    /// Number of frames (immutable after construction).
    pool_size: usize,
}

impl BufferPoolManager {
    /// Create a buffer pool with the default LRU eviction policy.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize, disk_manager: DiskManager) -> Self {
        Self::with_replacer(pool_size, disk_manager, Box::new(LruReplacer::new(pool_size)))
    }

    /// Create a buffer pool with an explicit eviction policy.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn with_replacer(
        pool_size: usize,
        disk_manager: DiskManager,
        replacer: Box<dyn Replacer>,
    ) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        let frames: Vec<Frame> = (0..pool_size).map(|_| Frame::new()).collect();

        // Every frame starts free.
        let free_list: Vec<FrameId> = (0..pool_size).map(FrameId::new).collect();

        Self {
            frames,
            latch: Mutex::new(PoolInner {
                page_table: HashMap::new(),
                free_list,
            }),
            replacer,
            disk_manager: Mutex::new(disk_manager),
            log_manager: None,
            metrics: PoolMetrics::new(),
            pool_size,
        }
    }

    /// Attach a write-ahead log handle.
    pub fn with_log_manager(mut self, log_manager: Arc<LogManager>) -> Self {
        self.log_manager = Some(log_manager);
        self
    }

    // ========================================================================
    // Public API: Fetch pages
    // ========================================================================

    /// Fetch a page for reading (shared access).
    ///
    /// Returns immediately on a cache hit; otherwise loads the page from
    /// disk, evicting another page if no frame is free.
    ///
    /// # Errors
    /// - `Error::NoFreeFrames` if every frame is pinned
    /// - `Error::PageNotFound` if the page doesn't exist on disk
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        let lock = self.frames[frame_id.index()].page();

        Ok(PageReadGuard::new(self, frame_id, page_id, lock))
    }

    /// Fetch a page for writing (exclusive access).
    ///
    /// Same as [`fetch_page_read`], but exclusive; the page is marked dirty
    /// when the guard releases.
    ///
    /// # Errors
    /// - `Error::NoFreeFrames` if every frame is pinned
    /// - `Error::PageNotFound` if the page doesn't exist on disk
    ///
    /// [`fetch_page_read`]: BufferPoolManager::fetch_page_read
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        let lock = self.frames[frame_id.index()].page_mut();

        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    /// [`fetch_page_read`] with failure collapsed to `None`.
    ///
    /// [`fetch_page_read`]: BufferPoolManager::fetch_page_read
    pub fn checked_read_page(&self, page_id: PageId) -> Option<PageReadGuard<'_>> {
        self.fetch_page_read(page_id).ok()
    }

    /// [`fetch_page_write`] with failure collapsed to `None`.
    ///
    /// [`fetch_page_write`]: BufferPoolManager::fetch_page_write
    pub fn checked_write_page(&self, page_id: PageId) -> Option<PageWriteGuard<'_>> {
        self.fetch_page_write(page_id).ok()
    }

    // ========================================================================
    // Public API: Create and delete pages
    // ========================================================================

    /// Allocate a fresh page on disk and return a pinned, zeroed frame
    /// for it.
    ///
    /// The frame is claimed before the page id is allocated, so a pool
    /// with every frame pinned fails without consuming an id.
    ///
    /// # Errors
    /// - `Error::NoFreeFrames` if every frame is pinned
    /// - I/O errors from disk allocation
    pub fn new_page(&self) -> Result<PageWriteGuard<'_>> {
        let mut inner = self.latch.lock();

        let frame_id = self.acquire_frame(&mut inner)?;

        let page_id = {
            let mut dm = self.disk_manager.lock();
            match dm.allocate_page() {
                Ok(pid) => pid,
                Err(e) => {
                    // The frame was already detached from any page; hand
                    // it back untouched.
                    inner.free_list.push(frame_id);
                    return Err(e);
                }
            }
        };

        let frame = &self.frames[frame_id.index()];
        frame.page_mut().reset();
        frame.bind(page_id);
        frame.pin();

        inner.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);
        drop(inner);

        debug!("new page {} in {}", page_id, frame_id);

        let lock = frame.page_mut();
        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    /// Allocate a page id on disk without bringing it into the pool.
    pub fn allocate_page_id(&self) -> Result<PageId> {
        let mut dm = self.disk_manager.lock();
        dm.allocate_page()
    }

    /// Permanently remove a page from the pool and deallocate it on disk.
    ///
    /// A non-resident page id is a success and a no-op: deallocating pages
    /// the pool never saw is the caller's policy, not the pool's.
    ///
    /// # Errors
    /// - `Error::PagePinned` if the page is in use
    /// - I/O errors from the write-back of a dirty page
    pub fn delete_page(&self, page_id: PageId) -> Result<()> {
        let mut inner = self.latch.lock();

        let frame_id = match inner.page_table.get(&page_id) {
            Some(&fid) => fid,
            None => return Ok(()),
        };

        let frame = &self.frames[frame_id.index()];
        if frame.is_pinned() {
            return Err(Error::PagePinned(page_id.raw()));
        }

        {
            let mut dm = self.disk_manager.lock();
            if frame.is_dirty() {
                let page = frame.page();
                dm.write_page(page_id, &page)?;
                self.metrics.record_writeback();
            }
            dm.deallocate_page(page_id);
        }

        inner.page_table.remove(&page_id);
        frame.detach();
        self.replacer.pin(frame_id); // drop it from the candidate set
        inner.free_list.push(frame_id);
        self.metrics.record_delete();

        debug!("deleted page {} from {}", page_id, frame_id);
        Ok(())
    }

    // ========================================================================
    // Public API: Pin management
    // ========================================================================

    /// Release one pin on a page, marking it dirty if `is_dirty`.
    ///
    /// This is the low-level counterpart of dropping a guard, for clients
    /// that manage pins by page id. The dirty bit is monotonic within a
    /// residency: unpinning clean never clears it.
    ///
    /// Returns `false` if the page is not resident or has no outstanding
    /// pins (a client bug; the frame is kept evictable either way).
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let inner = self.latch.lock();

        let frame_id = match inner.page_table.get(&page_id) {
            Some(&fid) => fid,
            None => return false,
        };

        let frame = &self.frames[frame_id.index()];
        if is_dirty {
            frame.mark_dirty();
        }

        match frame.try_unpin() {
            Some(remaining) => {
                if remaining == 0 {
                    self.replacer.unpin(frame_id);
                }
                trace!("unpinned {} (dirty: {})", page_id, is_dirty);
                true
            }
            None => {
                // More unpins than pins. Make sure the frame stays a
                // candidate and report the mismatch.
                warn!("unpin of {} with no outstanding pins", page_id);
                self.replacer.unpin(frame_id);
                false
            }
        }
    }

    /// Pin count of a resident page, or `None` if not resident.
    pub fn get_pin_count(&self, page_id: PageId) -> Option<u32> {
        let inner = self.latch.lock();
        let &frame_id = inner.page_table.get(&page_id)?;
        Some(self.frames[frame_id.index()].pin_count())
    }

    // ========================================================================
    // Public API: Flush pages
    // ========================================================================

    /// Write a resident page's buffer to disk and clear its dirty bit.
    ///
    /// The write is unconditional: flushing a clean page re-writes its
    /// current contents. Pin counts are unaffected. Callers must not hold
    /// a write guard on the page, or the flush will block on it.
    ///
    /// # Errors
    /// - `Error::InvalidPageId` for the sentinel id
    /// - `Error::PageNotResident` if the page is not in the pool
    /// - I/O errors from the disk write
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id.raw()));
        }

        let inner = self.latch.lock();

        let frame_id = match inner.page_table.get(&page_id) {
            Some(&fid) => fid,
            None => return Err(Error::PageNotResident(page_id.raw())),
        };

        let frame = &self.frames[frame_id.index()];
        {
            let page = frame.page();
            let mut dm = self.disk_manager.lock();
            dm.write_page(page_id, &page)?;
        }
        frame.clear_dirty();
        self.metrics.record_flush();
        drop(inner);

        debug!("flushed page {} from {}", page_id, frame_id);
        Ok(())
    }

    /// Write every resident dirty page to disk and clear its dirty bit.
    ///
    /// Pin counts are unaffected; a second call with no intervening writes
    /// issues no disk I/O.
    ///
    /// # Errors
    /// - I/O errors from disk writes
    pub fn flush_all_pages(&self) -> Result<()> {
        let inner = self.latch.lock();

        for (&page_id, &frame_id) in inner.page_table.iter() {
            let frame = &self.frames[frame_id.index()];
            if !frame.is_dirty() {
                continue;
            }

            {
                let page = frame.page();
                let mut dm = self.disk_manager.lock();
                dm.write_page(page_id, &page)?;
            }
            frame.clear_dirty();
            self.metrics.record_flush();
            trace!("flush_all wrote {} from {}", page_id, frame_id);
        }

        Ok(())
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    /// Get the pool's event counters.
    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }

    /// Get the pool size.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Number of frames currently holding no page.
    pub fn free_frame_count(&self) -> usize {
        self.latch.lock().free_list.len()
    }

    /// Number of resident pages.
    pub fn page_count(&self) -> usize {
        self.latch.lock().page_table.len()
    }

    /// Whether a page is resident.
    pub fn contains_page(&self, page_id: PageId) -> bool {
        self.latch.lock().page_table.contains_key(&page_id)
    }

    /// The attached write-ahead log handle, if any.
    pub fn log_manager(&self) -> Option<&Arc<LogManager>> {
        self.log_manager.as_ref()
    }

    // ========================================================================
    // Internal: Called by page guards on release
    // ========================================================================

    /// Release one pin taken through a guard. The guard has already
    /// released its data lock when this runs.
    pub(crate) fn unpin_frame(&self, frame_id: FrameId, is_dirty: bool) {
        let _inner = self.latch.lock();

        let frame = &self.frames[frame_id.index()];
        if is_dirty {
            frame.mark_dirty();
        }

        if frame.unpin() == 0 {
            self.replacer.unpin(frame_id);
        }
    }

    // ========================================================================
    // Internal: Core fetch logic
    // ========================================================================

    /// Bring a page into the pool (or find it there), pin it, and return
    /// its frame id.
    fn fetch_page_internal(&self, page_id: PageId) -> Result<FrameId> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id.raw()));
        }

        let mut inner = self.latch.lock();

        if let Some(&frame_id) = inner.page_table.get(&page_id) {
            let frame = &self.frames[frame_id.index()];
            frame.pin();
            self.replacer.pin(frame_id);
            self.metrics.record_hit();
            trace!("fetch hit: {} in {}", page_id, frame_id);
            return Ok(frame_id);
        }

        self.metrics.record_miss();

        let frame_id = self.acquire_frame(&mut inner)?;

        // Load from disk before publishing the mapping; a failed read must
        // leave nothing behind but a clean free frame.
        let page_data = {
            let mut dm = self.disk_manager.lock();
            dm.read_page(page_id)
        };
        let page_data = match page_data {
            Ok(page) => page,
            Err(e) => {
                inner.free_list.push(frame_id);
                return Err(e);
            }
        };

        let frame = &self.frames[frame_id.index()];
        frame
            .page_mut()
            .as_mut_slice()
            .copy_from_slice(page_data.as_slice());
        frame.bind(page_id);
        frame.pin();

        inner.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);

        trace!("fetch miss: {} loaded into {}", page_id, frame_id);
        Ok(frame_id)
    }

    // ========================================================================
    // Internal: Frame allocation and eviction
    // ========================================================================

    /// Claim an empty frame: pop the free list, else evict a victim.
    ///
    /// The returned frame is unmapped, unpinned, and clean.
    fn acquire_frame(&self, inner: &mut PoolInner) -> Result<FrameId> {
        if let Some(frame_id) = inner.free_list.pop() {
            return Ok(frame_id);
        }

        self.evict_victim(inner)
    }

    /// Evict the replacer's victim, writing it back if dirty.
    fn evict_victim(&self, inner: &mut PoolInner) -> Result<FrameId> {
        let frame_id = self.replacer.victim().ok_or(Error::NoFreeFrames)?;

        let frame = &self.frames[frame_id.index()];
        let old_page_id = frame.page_id();

        if frame.is_dirty() {
            if let Some(page_id) = old_page_id {
                let write_result = {
                    let page = frame.page();
                    let mut dm = self.disk_manager.lock();
                    dm.write_page(page_id, &page)
                };
                if let Err(e) = write_result {
                    // The frame stays resident; put it back in the
                    // candidate set so the pool remains consistent.
                    self.replacer.unpin(frame_id);
                    return Err(e);
                }
                self.metrics.record_writeback();
                debug!("write-back: {} from {}", page_id, frame_id);
            }
        }

        if let Some(page_id) = old_page_id {
            inner.page_table.remove(&page_id);
            debug!("evict: {} from {}", page_id, frame_id);
        }

        frame.detach();
        self.metrics.record_eviction();

        Ok(frame_id)
    }
}
