//! Disk Manager - low-level file I/O for database pages.
//!
//! The [`DiskManager`] handles all direct file operations:
//! - Reading and writing pages
//! - Allocating and deallocating page ids
//! - Managing the database file

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{debug, trace};

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Manages disk I/O for a single database file.
///
/// # File Layout
/// The database is a single file with pages laid out sequentially; page N
/// lives at byte offset `N × PAGE_SIZE`.
///
/// # Allocation
/// Page ids are handed out sequentially. [`deallocate_page`] returns an id
/// to an in-memory free list and [`allocate_page`] reuses those ids before
/// extending the file. The free list is not persisted; reopening a file
/// starts with an empty one (reclaiming it belongs to a higher layer).
///
/// # Thread Safety
/// `DiskManager` is single-threaded. The `BufferPoolManager` serializes
/// access behind its own mutex.
///
/// # Durability
/// Writes and allocations are followed by `fsync()`.
///
/// [`deallocate_page`]: DiskManager::deallocate_page
/// [`allocate_page`]: DiskManager::allocate_page
pub struct DiskManager {
    file: File,
    /// High-water mark: number of pages ever allocated in the file.
    page_count: u32,
    /// Deallocated page ids available for reuse.
    free_pages: Vec<PageId>,
}

impl DiskManager {
    /// Create a new database file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            page_count: 0,
            free_pages: Vec::new(),
        })
    }

    /// Open an existing database file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        // Derive the page count from the file size.
        let metadata = file.metadata()?;
        let page_count = (metadata.len() / PAGE_SIZE as u64) as u32;

        Ok(Self {
            file,
            page_count,
            free_pages: Vec::new(),
        })
    }

    /// Open an existing database file, or create it if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Read a page from disk into a fresh buffer.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page was never allocated.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        if page_id.raw() >= self.page_count {
            return Err(Error::PageNotFound(page_id.raw()));
        }

        self.file.seek(SeekFrom::Start(page_id.file_offset()))?;

        let mut page = Page::new();
        self.file.read_exact(page.as_mut_slice())?;

        trace!("read page {} from disk", page_id);
        Ok(page)
    }

    /// Write a page to disk, followed by `fsync()`.
    ///
    /// The page must have been previously allocated.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page was never allocated.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        if page_id.raw() >= self.page_count {
            return Err(Error::PageNotFound(page_id.raw()));
        }

        self.file.seek(SeekFrom::Start(page_id.file_offset()))?;
        self.file.write_all(page.as_slice())?;
        self.file.sync_all()?;

        trace!("wrote page {} to disk", page_id);
        Ok(())
    }

    /// Allocate a page id, reusing a deallocated one if available.
    ///
    /// The page's on-disk contents are zeroed, and the allocation is made
    /// durable before the id is returned.
    pub fn allocate_page(&mut self) -> Result<PageId> {
        let page_id = match self.free_pages.pop() {
            Some(pid) => pid,
            None => {
                let pid = PageId::new(self.page_count);
                self.page_count += 1;
                pid
            }
        };

        self.file.seek(SeekFrom::Start(page_id.file_offset()))?;

        let zeros = [0u8; PAGE_SIZE];
        self.file.write_all(&zeros)?;
        self.file.sync_all()?;

        debug!("allocated page {}", page_id);
        Ok(page_id)
    }

    /// Release a page id for reuse by a later [`allocate_page`] call.
    ///
    /// The on-disk bytes are left in place; reading a deallocated page is
    /// permitted and returns whatever was last written there.
    ///
    /// [`allocate_page`]: DiskManager::allocate_page
    pub fn deallocate_page(&mut self, page_id: PageId) {
        if page_id.is_valid() && page_id.raw() < self.page_count {
            debug!("deallocated page {}", page_id);
            self.free_pages.push(page_id);
        }
    }

    /// Number of pages ever allocated in the database file.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Total size of the database file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        (self.page_count as u64) * (PAGE_SIZE as u64)
    }
}
