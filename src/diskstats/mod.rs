//! Block device I/O counters as reported by the kernel.
//!
//! Counters are read fresh on every call to [`parse`]; nothing here is cached.

mod error;
mod parser;

pub use error::{Error, Result};
pub use parser::{parse, parse_from_reader};

/// Default location of the kernel I/O statistics table.
pub const DEFAULT_DISKSTATS_PATH: &str = "/proc/diskstats";

/// Number of counters read per device.
pub const DISK_STATS_FIELDS: usize = 11;

/// Monotonic I/O counters for one block device, in kernel column order.
///
/// Times are in milliseconds, sectors are 512 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct DiskStats {
    pub reads_completed: u64,
    pub reads_merged: u64,
    pub sectors_read: u64,
    pub read_time: u64,
    pub writes_completed: u64,
    pub writes_merged: u64,
    pub sectors_written: u64,
    pub write_time: u64,
    pub io_in_progress: u64,
    pub io_time: u64,
    pub weighted_io_time: u64,
}

impl From<[u64; DISK_STATS_FIELDS]> for DiskStats {
    fn from(counters: [u64; DISK_STATS_FIELDS]) -> Self {
        let [
            reads_completed,
            reads_merged,
            sectors_read,
            read_time,
            writes_completed,
            writes_merged,
            sectors_written,
            write_time,
            io_in_progress,
            io_time,
            weighted_io_time,
        ] = counters;

        Self {
            reads_completed,
            reads_merged,
            sectors_read,
            read_time,
            writes_completed,
            writes_merged,
            sectors_written,
            write_time,
            io_in_progress,
            io_time,
            weighted_io_time,
        }
    }
}
