//! Capacity and inode statistics for tracked partitions.
//!
//! The statistics source is chosen once per partition by [`StatKind`]:
//!
//! - `zfs` datasets: [`ZfsStrategy`] (`zfs get`)
//! - `devicemapper` thin pools: [`ThinPoolStrategy`] (`dmsetup status`)
//! - everything else: [`StatvfsStrategy`] (`statvfs(2)` on the mountpoint)
//!
//! Adding a filesystem type means adding a [`StatKind`] variant and a
//! [`StatStrategy`] implementation; [`FsStatsCache`] does the dispatch.

mod cache;
mod devicemapper;
mod error;
mod generic;
mod strategy;
mod zfs;

pub use cache::FsStatsCache;
pub use devicemapper::ThinPoolStrategy;
pub use error::{Error, Result};
pub use generic::StatvfsStrategy;
pub use strategy::{StatKind, StatStrategy, Strategies};
pub use zfs::ZfsStrategy;

/// Which statistics source produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FsType {
    Zfs,
    DeviceMapper,
    Vfs,
}

impl FsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FsType::Zfs => "zfs",
            FsType::DeviceMapper => "devicemapper",
            FsType::Vfs => "vfs",
        }
    }
}

impl std::fmt::Display for FsType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time usage of one filesystem, in bytes and inodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsUsage {
    pub fs_type: FsType,
    pub capacity: u64,
    pub free: u64,
    pub available: u64,
    pub inodes: u64,
    pub inodes_free: u64,
}
