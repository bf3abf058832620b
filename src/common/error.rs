//! Error types for LatchDB.

use std::fmt;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write
/// `Result<T>`, the same pattern as `std::io::Result`.
pub type Result<T> = std::result::Result<T, Error>;

/// All failure kinds surfaced by the storage core.
///
/// A single error type keeps handling uniform across the disk manager and
/// the buffer pool. Callers that only care about success can use the
/// `checked_*` methods on the pool, which collapse these into `Option`.
#[derive(Debug)]
pub enum Error {
    /// I/O error from the underlying database file.
    Io(std::io::Error),

    /// Requested page does not exist on disk.
    PageNotFound(u32),

    /// Every frame in the pool is pinned; nothing can be evicted.
    NoFreeFrames,

    /// The sentinel page id was passed where a real page id is required.
    InvalidPageId(u32),

    /// The page is not resident in the buffer pool.
    PageNotResident(u32),

    /// The page is pinned and cannot be deleted.
    PagePinned(u32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::PageNotFound(pid) => write!(f, "Page {} not found on disk", pid),
            Error::NoFreeFrames => write!(f, "No evictable frames in buffer pool"),
            Error::InvalidPageId(pid) => write!(f, "Invalid page ID: {}", pid),
            Error::PageNotResident(pid) => write!(f, "Page {} is not in the buffer pool", pid),
            Error::PagePinned(pid) => write!(f, "Page {} is pinned", pid),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
