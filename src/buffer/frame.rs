//! Frame - a slot in the buffer pool.

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::config::INVALID_PAGE_ID;
use crate::common::PageId;
use crate::storage::Page;

/// A slot in the buffer pool, holding at most one page.
///
/// Page *data* sits behind its own `RwLock` so pinned clients read and
/// write without the pool latch. The bookkeeping lives in two atomic
/// words, mutated only while the pool latch is held:
///
/// - `page_id`: raw id of the resident page, [`INVALID_PAGE_ID`] while
///   the frame is empty (the sentinel never leaves this word: the
///   accessor yields an `Option`)
/// - `state`: the dirty flag in the top bit, the pin count in the rest
///
/// Folding the dirty flag and pin count into one word means a single
/// load observes both together and clearing a frame is a single store.
pub struct Frame {
    page: RwLock<Page>,
    page_id: AtomicU32,
    state: AtomicU32,
}

impl Frame {
    const DIRTY_BIT: u32 = 1 << 31;
    const PIN_MASK: u32 = Self::DIRTY_BIT - 1;

    /// Create an empty, clean, unpinned frame.
    pub fn new() -> Self {
        Self {
            page: RwLock::new(Page::new()),
            page_id: AtomicU32::new(INVALID_PAGE_ID),
            state: AtomicU32::new(0),
        }
    }

    /// Acquire a shared lock on the page data.
    #[inline]
    pub fn page(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Acquire an exclusive lock on the page data.
    #[inline]
    pub fn page_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    /// Id of the resident page, or `None` for an empty frame.
    #[inline]
    pub fn page_id(&self) -> Option<PageId> {
        let raw = self.page_id.load(Ordering::Relaxed);
        if raw == INVALID_PAGE_ID {
            None
        } else {
            Some(PageId::new(raw))
        }
    }

    /// Install a page id into this frame.
    #[inline]
    pub fn bind(&self, page_id: PageId) {
        debug_assert!(page_id.is_valid());
        self.page_id.store(page_id.raw(), Ordering::Relaxed);
    }

    /// Drop the page binding and the dirty flag.
    ///
    /// Callers only detach unpinned frames; outstanding pins are left
    /// untouched (there are none).
    #[inline]
    pub fn detach(&self) {
        self.page_id.store(INVALID_PAGE_ID, Ordering::Relaxed);
        self.state.fetch_and(!Self::DIRTY_BIT, Ordering::Relaxed);
    }

    /// Take one pin. Returns the new pin count.
    #[inline]
    pub fn pin(&self) -> u32 {
        (self.state.fetch_add(1, Ordering::Relaxed) & Self::PIN_MASK) + 1
    }

    /// Release one pin if any is outstanding.
    ///
    /// Returns the remaining pin count, or `None` when there was nothing
    /// to release (the state word is left untouched in that case).
    pub fn try_unpin(&self) -> Option<u32> {
        self.state
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |state| {
                if state & Self::PIN_MASK == 0 {
                    None
                } else {
                    Some(state - 1)
                }
            })
            .ok()
            .map(|old| (old & Self::PIN_MASK) - 1)
    }

    /// Release one pin. Returns the remaining pin count.
    ///
    /// # Panics
    /// Panics when no pin is outstanding. Callers that cannot rule the
    /// mismatch out use [`try_unpin`](Frame::try_unpin) instead.
    #[inline]
    pub fn unpin(&self) -> u32 {
        match self.try_unpin() {
            Some(remaining) => remaining,
            None => panic!("unpin without matching pin"),
        }
    }

    /// Current pin count.
    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.state.load(Ordering::Relaxed) & Self::PIN_MASK
    }

    /// Whether any client holds a pin.
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    /// Mark the page contents as diverged from disk.
    #[inline]
    pub fn mark_dirty(&self) {
        self.state.fetch_or(Self::DIRTY_BIT, Ordering::Relaxed);
    }

    /// Record that the contents were written back.
    #[inline]
    pub fn clear_dirty(&self) {
        self.state.fetch_and(!Self::DIRTY_BIT, Ordering::Relaxed);
    }

    /// Whether the page contents differ from disk.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.state.load(Ordering::Relaxed) & Self::DIRTY_BIT != 0
    }

    /// Whether the frame could be chosen as an eviction victim.
    #[inline]
    pub fn is_evictable(&self) -> bool {
        self.page_id().is_some() && !self.is_pinned()
    }
}
