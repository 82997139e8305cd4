//! Parser for the kernel's block-device I/O statistics table (`/proc/diskstats`).
//!
//! Each line looks like
//!
//! ```text
//!    8      50 sdd2 40 0 280 223 7 0 22 108 0 330 330
//! ```
//!
//! i.e. major, minor, short device name, then the counters. Only the first
//! [`DISK_STATS_FIELDS`] counters are read; newer kernels append discard and
//! flush columns which are ignored.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use crate::device;
use crate::fsutil;

use super::{DISK_STATS_FIELDS, DiskStats, Error, Result};

/// Index of the short device name on each line.
const DEVICE_NAME_COLUMN: usize = 2;

/// Parses the I/O statistics table at `path` into a map keyed by absolute device path.
///
/// A missing file is not an error: hosts without the interface yield an empty map.
///
/// # Errors
///
/// - [`Error::FileOpen`] if the file exists but cannot be opened.
/// - [`Error::ReadLine`] if reading fails.
/// - [`Error::MissingFields`] / [`Error::InvalidValue`] if any tracked device line is malformed.
///
/// # Example
///
/// ```no_run
/// let stats = fsinfo::diskstats::parse("/proc/diskstats").unwrap();
/// if let Some(sda) = stats.get("/dev/sda") {
///     println!("sda reads: {}", sda.reads_completed);
/// }
/// ```
pub fn parse(path: impl AsRef<Path>) -> Result<HashMap<String, DiskStats>> {
    let path = path.as_ref();
    match fsutil::open_optional_file_reader(path)? {
        Some(reader) => parse_from_reader(reader, path),
        None => {
            log::info!(
                "not collecting filesystem statistics because file `{}` was not available",
                path.display()
            );
            Ok(HashMap::new())
        }
    }
}

/// Parses I/O statistics from an already opened reader.
///
/// `origin` is only used in error messages.
pub fn parse_from_reader<R: BufRead>(
    mut reader: R,
    origin: &Path,
) -> Result<HashMap<String, DiskStats>> {
    let mut stats = HashMap::new();
    let mut line = String::with_capacity(128);
    let mut lineno = 0;

    while reader
        .read_line(&mut line)
        .map_err(|source| Error::ReadLine {
            path: origin.to_path_buf(),
            source,
        })?
        != 0
    {
        lineno += 1;
        if let Some((name, disk_stats)) = parse_line(&line, lineno)? {
            stats.insert(device::device_path(name), disk_stats);
        }
        line.clear();
    }

    Ok(stats)
}

/// Parses one table line. Returns `Ok(None)` for devices that are not tracked
/// and for lines too short to carry a device name.
fn parse_line(line: &str, lineno: usize) -> Result<Option<(&str, DiskStats)>> {
    let mut fields = line.split_whitespace();
    let Some(name) = fields.nth(DEVICE_NAME_COLUMN) else {
        return Ok(None);
    };
    if !device::is_tracked_device_name(name) {
        return Ok(None);
    }

    let mut counters = [0u64; DISK_STATS_FIELDS];
    let mut found = 0;
    for (slot, raw) in counters.iter_mut().zip(fields.by_ref()) {
        *slot = raw.parse().map_err(|source| Error::InvalidValue {
            device: name.to_owned(),
            value: raw.to_owned(),
            line: lineno,
            source,
        })?;
        found += 1;
    }

    if found < DISK_STATS_FIELDS {
        return Err(Error::MissingFields {
            device: name.to_owned(),
            line: lineno,
            expected: DISK_STATS_FIELDS,
            found,
        });
    }

    Ok(Some((name, DiskStats::from(counters))))
}
