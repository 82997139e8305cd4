use crate::fsutil;

use super::parser::{MountInfo, parse_mount_info_line};
use super::{Error, Result};
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// An owned mount table entry, reduced to what partition discovery needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub major: u32,
    pub minor: u32,
    pub mount_point: PathBuf,
    pub fs_type: String,
    /// Mount source as written by the kernel, e.g. `/dev/sdb1` or `tank/data`.
    pub source: String,
}

impl From<MountInfo<'_>> for MountEntry {
    fn from(info: MountInfo<'_>) -> Self {
        Self {
            major: info.major,
            minor: info.minor,
            mount_point: PathBuf::from(info.mount_point.into_owned()),
            fs_type: info.fs_type.to_owned(),
            source: info.source.into_owned(),
        }
    }
}

/// Reads every entry of a Linux `mountinfo` file, in table order.
///
/// # Arguments
///
/// * `path` - Path to a Linux mountinfo file (e.g., `/proc/self/mountinfo`).
///
/// # Errors
///
/// - [`Error::FileOpen`] if the file can't be opened.
/// - [`Error::ReadLine`] if reading from the file fails.
/// - [`Error::Parse`] if parsing any line fails.
///
/// # Example
///
/// ```no_run
/// use fsinfo::mountinfo::read_mount_table;
///
/// for entry in read_mount_table("/proc/self/mountinfo").unwrap() {
///     println!("{} on {}", entry.source, entry.mount_point.display());
/// }
/// ```
pub fn read_mount_table(path: impl AsRef<Path>) -> Result<Vec<MountEntry>> {
    let path = path.as_ref();
    let buf = fsutil::open_file_reader(path)?;

    read_mount_table_from_reader(buf, path)
}

/// Internal implementation reading mount entries from a reader.
///
/// Blank lines are skipped; any other malformed line fails the whole read.
///
/// # Arguments
///
/// * `reader` - Buffered reader over the mountinfo content.
/// * `origin` - Logical origin of the data, used in error messages.
pub(crate) fn read_mount_table_from_reader<R: BufRead>(
    mut reader: R,
    origin: &Path,
) -> Result<Vec<MountEntry>> {
    let mut line = String::with_capacity(256);
    let mut entries = Vec::new();

    while reader
        .read_line(&mut line)
        .map_err(|source| Error::ReadLine {
            path: origin.to_path_buf(),
            source,
        })?
        != 0
    {
        let trimmed = line.trim_end_matches('\n');
        if !trimmed.trim().is_empty() {
            let mount_info = parse_mount_info_line(trimmed).map_err(|source| Error::Parse {
                path: origin.to_path_buf(),
                source,
            })?;
            log::trace!(
                "mount entry: {} on {} type {}",
                mount_info.source,
                mount_info.mount_point,
                mount_info.fs_type
            );
            entries.push(MountEntry::from(mount_info));
        }

        line.clear();
    }

    Ok(entries)
}
