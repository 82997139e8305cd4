use nix::sys::statvfs::statvfs;

use crate::partition::Partition;

use super::{Error, FsType, FsUsage, Result, StatStrategy};

/// Reads usage with `statvfs(2)` on the partition's mountpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatvfsStrategy;

impl StatStrategy for StatvfsStrategy {
    fn stat(&self, _device: &str, partition: &Partition) -> Result<FsUsage> {
        let stat = statvfs(partition.mountpoint.as_path()).map_err(|source| Error::Statvfs {
            path: partition.mountpoint.clone(),
            source,
        })?;

        let frsize = stat.fragment_size() as u64;
        Ok(FsUsage {
            fs_type: FsType::Vfs,
            capacity: stat.blocks() as u64 * frsize,
            free: stat.blocks_free() as u64 * frsize,
            available: stat.blocks_available() as u64 * frsize,
            inodes: stat.files() as u64,
            inodes_free: stat.files_free() as u64,
        })
    }

    // A single syscall; always report fresh numbers.
    fn cacheable(&self) -> bool {
        false
    }
}
