use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::device;
use crate::mountinfo::{self, MountEntry};

use super::context::RuntimeContext;
use super::labels::{self, ROOT_LABEL, RUNTIME_IMAGES_LABEL};
use super::{Partition, Result};

/// Filesystem type tag selecting dataset-based statistics.
pub const ZFS_FS_TYPE: &str = "zfs";

/// Filesystem type tag of a devicemapper thin pool partition.
pub const DEVICE_MAPPER_FS_TYPE: &str = "devicemapper";

/// Default mount table consulted by [`HostMountSource`].
pub const DEFAULT_MOUNTINFO_PATH: &str = "/proc/self/mountinfo";

/// Default directory holding devicemapper device nodes.
pub const DEFAULT_MAPPER_DIR: &str = "/dev/mapper";

/// Result of one discovery pass, in discovery order.
///
/// Duplicates are allowed here; [`super::PartitionCache`] resolves them when
/// building its snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discovery {
    /// `(device path, partition)` pairs.
    pub partitions: Vec<(String, Partition)>,
    /// `(label, device path)` pairs.
    pub labels: Vec<(String, String)>,
}

/// Discovers the set of partitions to track.
pub trait MountSource: Send + Sync {
    /// Performs a full discovery pass.
    ///
    /// # Errors
    ///
    /// Any error aborts the pass; the caller keeps its previous state.
    fn discover(&self) -> Result<Discovery>;
}

/// [`MountSource`] backed by the host's mount table and udev label links.
#[derive(Debug, Clone)]
pub struct HostMountSource {
    mountinfo_path: PathBuf,
    label_dir: PathBuf,
    mapper_dir: PathBuf,
    context: RuntimeContext,
}

impl Default for HostMountSource {
    fn default() -> Self {
        Self::new(RuntimeContext::default())
    }
}

impl HostMountSource {
    pub fn new(context: RuntimeContext) -> Self {
        Self {
            mountinfo_path: PathBuf::from(DEFAULT_MOUNTINFO_PATH),
            label_dir: PathBuf::from(labels::DEFAULT_LABEL_DIR),
            mapper_dir: PathBuf::from(DEFAULT_MAPPER_DIR),
            context,
        }
    }

    /// Overrides the mount table path (e.g. `/rootfs/proc/1/mountinfo`).
    pub fn with_mountinfo_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.mountinfo_path = path.into();
        self
    }

    /// Overrides the udev by-label directory.
    pub fn with_label_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.label_dir = path.into();
        self
    }

    /// Overrides the devicemapper node directory.
    pub fn with_mapper_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.mapper_dir = path.into();
        self
    }

    pub fn context(&self) -> &RuntimeContext {
        &self.context
    }

    /// Decides whether a mount entry is tracked and under which device path.
    fn classify(&self, entry: &MountEntry) -> Option<String> {
        if entry.fs_type == ZFS_FS_TYPE {
            return Some(entry.source.clone());
        }

        let device = resolve_device(&entry.source);
        if device::is_tracked_device_path(&device) {
            return Some(device);
        }

        if self.context.root.as_deref() == Some(entry.mount_point.as_path()) {
            log::debug!(
                "tracking runtime root mount `{}` ({} on {})",
                entry.mount_point.display(),
                entry.source,
                entry.fs_type
            );
            return Some(device);
        }

        None
    }

    /// Builds the devicemapper thin pool partition, if that driver is active.
    fn thin_pool_partition(&self) -> Option<(String, Partition)> {
        let pool = self.context.thin_pool_name()?;
        let node = self.mapper_dir.join(pool);
        let stat = match nix::sys::stat::stat(&node) {
            Ok(stat) => stat,
            Err(err) => {
                log::warn!(
                    "ignoring devicemapper thin pool `{pool}`: cannot stat `{}`: {err}",
                    node.display()
                );
                return None;
            }
        };

        let rdev = device::rdev_of(&stat);
        let partition = Partition {
            mountpoint: PathBuf::new(),
            major: device::major(rdev),
            minor: device::minor(rdev),
            fs_type: DEVICE_MAPPER_FS_TYPE.to_owned(),
            block_size: self.context.thin_pool_block_size().unwrap_or_default(),
        };
        Some((pool.to_owned(), partition))
    }
}

impl MountSource for HostMountSource {
    fn discover(&self) -> Result<Discovery> {
        let entries = mountinfo::read_mount_table(&self.mountinfo_path)?;

        let mut seen = HashSet::new();
        let mut partitions = Vec::new();
        for entry in entries {
            let Some(device) = self.classify(&entry) else {
                log::trace!(
                    "skipping mount `{}` ({} on {})",
                    entry.mount_point.display(),
                    entry.source,
                    entry.fs_type
                );
                continue;
            };
            if !seen.insert(device.clone()) {
                log::debug!(
                    "skipping bind mount of `{device}` at `{}`",
                    entry.mount_point.display()
                );
                continue;
            }

            partitions.push((
                device,
                Partition {
                    mountpoint: entry.mount_point,
                    major: entry.major,
                    minor: entry.minor,
                    fs_type: entry.fs_type,
                    block_size: 0,
                },
            ));
        }

        let thin_pool = self.thin_pool_partition();
        if let Some((pool, partition)) = &thin_pool {
            if seen.insert(pool.clone()) {
                partitions.push((pool.clone(), partition.clone()));
            }
        }

        let mut labels = Vec::new();
        if let Some(device) = device_for_path(&partitions, Path::new("/")) {
            labels.push((ROOT_LABEL.to_owned(), device));
        }
        let runtime_device = match (&thin_pool, &self.context.root) {
            (Some((pool, _)), _) => Some(pool.clone()),
            (None, Some(root)) => device_for_path(&partitions, root),
            (None, None) => None,
        };
        if let Some(device) = runtime_device {
            labels.push((RUNTIME_IMAGES_LABEL.to_owned(), device));
        }

        let tracked: HashSet<&str> = partitions.iter().map(|(d, _)| d.as_str()).collect();
        labels.extend(
            labels::read_label_dir(&self.label_dir)?
                .into_iter()
                .filter(|(_, device)| tracked.contains(device.as_str())),
        );

        Ok(Discovery { partitions, labels })
    }
}

/// Resolves symlinked device sources (`/dev/mapper/vg-lv`, `/dev/disk/by-uuid/...`)
/// to their canonical node. Non-path sources and dangling links are returned as-is.
fn resolve_device(source: &str) -> String {
    if !source.starts_with('/') {
        return source.to_owned();
    }
    match std::fs::canonicalize(source) {
        Ok(path) => path.to_string_lossy().into_owned(),
        Err(_) => source.to_owned(),
    }
}

/// Returns the device of the partition whose mountpoint is the longest prefix of `path`.
fn device_for_path(partitions: &[(String, Partition)], path: &Path) -> Option<String> {
    partitions
        .iter()
        .filter(|(_, p)| !p.mountpoint.as_os_str().is_empty() && path.starts_with(&p.mountpoint))
        .max_by_key(|(_, p)| p.mountpoint.components().count())
        .map(|(device, _)| device.clone())
}
