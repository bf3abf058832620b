//! Write-ahead logging hooks.
//!
//! Only the [`LogManager`] handle the buffer pool carries lives here; log
//! records and crash recovery are future work.

mod log_manager;

pub use log_manager::LogManager;
