//! Discovery and caching of the partitions worth reporting on.
//!
//! A partition is tracked when its mount source resolves to a SCSI / Xen disk
//! or device-mapper node (see [`crate::device::is_tracked_device_name`]), when
//! it is a ZFS dataset, when it is mounted exactly at the container runtime's
//! storage root, or when it is the runtime's devicemapper thin pool.
//!
//! # Key Components
//!
//! - [`MountSource`]: the discovery seam; [`HostMountSource`] reads the host's
//!   mount table and udev label links.
//! - [`PartitionCache`]: snapshot cache with device, major:minor and label
//!   lookups.
//! - [`RuntimeContext`]: container runtime storage layout feeding discovery.

mod cache;
mod context;
mod error;
mod labels;
mod source;

use std::path::PathBuf;

pub use cache::{PartitionCache, Snapshot};
pub use context::{
    DEVICE_MAPPER_DRIVER, POOL_BLOCK_SIZE_KEY, POOL_NAME_KEY, RuntimeContext, parse_human_size,
};
pub use error::{Error, Result};
pub use labels::{DEFAULT_LABEL_DIR, ROOT_LABEL, RUNTIME_IMAGES_LABEL, read_label_dir};
pub use source::{
    DEFAULT_MAPPER_DIR, DEFAULT_MOUNTINFO_PATH, DEVICE_MAPPER_FS_TYPE, Discovery, HostMountSource,
    MountSource, ZFS_FS_TYPE,
};

/// A tracked, mounted block device (or dataset / thin pool).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Partition {
    /// Where the partition is mounted; empty for a devicemapper thin pool.
    pub mountpoint: PathBuf,
    pub major: u32,
    pub minor: u32,
    /// Raw kernel filesystem type (`ext4`, `xfs`, `zfs`, ...) or `devicemapper`.
    pub fs_type: String,
    /// Allocation block size in bytes where known (thin pools), otherwise 0.
    pub block_size: u64,
}
