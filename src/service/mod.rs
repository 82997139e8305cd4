//! Filesystem inventory façade over the partition and statistics caches.

mod error;
mod fs;

pub use error::{Error, Result};
pub use fs::{Fs, FsInfoService};
