//! Crate-wide constants.

/// Size of a page in bytes (4KB).
///
/// The unit of disk I/O and of buffer pool framing. Matches the OS page
/// size so page-granular reads and writes stay aligned with what the
/// kernel and SSDs do internally. Both sides of the disk boundary share
/// this value; there is no per-file page size.
pub const PAGE_SIZE: usize = 4096;

/// Raw sentinel id meaning "no page".
///
/// This value exists at the disk boundary: empty frames persist it in
/// their metadata word, and it is never allocatable. API surfaces wrap it
/// as [`PageId::INVALID`](crate::common::PageId::INVALID) or express
/// absence with `Option` instead of leaking the raw number.
pub const INVALID_PAGE_ID: u32 = u32::MAX;
