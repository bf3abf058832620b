//! RAII guards for page access.
//!
//! - [`PageReadGuard`] - shared access; several may coexist per page
//! - [`PageWriteGuard`] - exclusive access; marks the page dirty on release
//!
//! A guard holds one pin on its page. Dropping the guard (or calling the
//! explicit, idempotent `drop_guard`) releases the data lock first and the
//! pin second, preserving the pool's `latch → frame-data` lock order.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FrameId, PageId};
use crate::storage::Page;

use super::buffer_pool_manager::BufferPoolManager;

/// Guard for shared read access to a page.
///
/// # Example
/// ```ignore
/// let guard = bpm.fetch_page_read(page_id)?;
/// let bytes = guard.as_slice();
/// // guard drops here: pin released
/// ```
pub struct PageReadGuard<'a> {
    /// Pool reference for the unpin on release.
    bpm: &'a BufferPoolManager,
    /// Frame holding this page.
    frame_id: FrameId,
    /// Page id for convenience.
    page_id: PageId,
    /// Data lock; `None` once the guard has been dropped early.
    lock: Option<RwLockReadGuard<'a, Page>>,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockReadGuard<'a, Page>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            lock: Some(lock),
        }
    }

    /// Get the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Get the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Release the guard now instead of at end of scope.
    ///
    /// Idempotent; further calls do nothing. The page must not be accessed
    /// through this guard afterwards.
    pub fn drop_guard(&mut self) {
        if self.lock.take().is_some() {
            self.bpm.unpin_frame(self.frame_id, false);
        }
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = Page;

    /// # Panics
    /// Panics if the guard was already released with `drop_guard`.
    #[inline]
    fn deref(&self) -> &Page {
        self.lock.as_ref().expect("page guard used after drop_guard")
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        self.drop_guard();
    }
}

/// Guard for exclusive write access to a page.
///
/// Releasing the guard marks the page dirty; there is no way to write
/// through it and skip the dirty bit.
///
/// # Example
/// ```ignore
/// let mut guard = bpm.fetch_page_write(page_id)?;
/// guard.as_mut_slice()[0] = 0xFF;
/// // guard drops here: page dirty, pin released
/// ```
pub struct PageWriteGuard<'a> {
    /// Pool reference for the unpin on release.
    bpm: &'a BufferPoolManager,
    /// Frame holding this page.
    frame_id: FrameId,
    /// Page id for convenience.
    page_id: PageId,
    /// Data lock; `None` once the guard has been dropped early.
    lock: Option<RwLockWriteGuard<'a, Page>>,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockWriteGuard<'a, Page>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            lock: Some(lock),
        }
    }

    /// Get the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Get the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Release the guard now instead of at end of scope.
    ///
    /// Idempotent; further calls do nothing. The page must not be accessed
    /// through this guard afterwards.
    pub fn drop_guard(&mut self) {
        if self.lock.take().is_some() {
            self.bpm.unpin_frame(self.frame_id, true);
        }
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = Page;

    /// # Panics
    /// Panics if the guard was already released with `drop_guard`.
    #[inline]
    fn deref(&self) -> &Page {
        self.lock.as_ref().expect("page guard used after drop_guard")
    }
}

impl DerefMut for PageWriteGuard<'_> {
    /// # Panics
    /// Panics if the guard was already released with `drop_guard`.
    #[inline]
    fn deref_mut(&mut self) -> &mut Page {
        self.lock.as_mut().expect("page guard used after drop_guard")
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        self.drop_guard();
    }
}
