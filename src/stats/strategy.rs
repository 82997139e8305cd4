use std::process::Command;

use crate::partition::{DEVICE_MAPPER_FS_TYPE, Partition, ZFS_FS_TYPE};

use super::devicemapper::ThinPoolStrategy;
use super::generic::StatvfsStrategy;
use super::zfs::ZfsStrategy;
use super::{Error, FsUsage, Result};

/// Computes usage numbers for one partition.
pub trait StatStrategy: Send + Sync {
    /// Returns current statistics for `device`, mounted as described by `partition`.
    ///
    /// # Errors
    ///
    /// Any failure of the underlying syscall or tool.
    fn stat(&self, device: &str, partition: &Partition) -> Result<FsUsage>;

    /// Whether results may be kept until the owning cache is cleared.
    fn cacheable(&self) -> bool {
        true
    }
}

/// The statistics source a partition is served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    /// Dataset property queries.
    Zfs,
    /// Thin pool metadata queries.
    DeviceMapper,
    /// `statvfs(2)` on the mountpoint.
    Generic,
}

impl StatKind {
    /// Selects the statistics source from the partition's filesystem type.
    pub fn for_partition(partition: &Partition) -> Self {
        match partition.fs_type.as_str() {
            ZFS_FS_TYPE => StatKind::Zfs,
            DEVICE_MAPPER_FS_TYPE => StatKind::DeviceMapper,
            _ => StatKind::Generic,
        }
    }
}

/// One strategy per [`StatKind`].
pub struct Strategies {
    zfs: Box<dyn StatStrategy>,
    device_mapper: Box<dyn StatStrategy>,
    generic: Box<dyn StatStrategy>,
}

impl Default for Strategies {
    fn default() -> Self {
        Self {
            zfs: Box::new(ZfsStrategy::default()),
            device_mapper: Box::new(ThinPoolStrategy::default()),
            generic: Box::new(StatvfsStrategy),
        }
    }
}

impl Strategies {
    pub fn with_zfs(mut self, strategy: impl StatStrategy + 'static) -> Self {
        self.zfs = Box::new(strategy);
        self
    }

    pub fn with_device_mapper(mut self, strategy: impl StatStrategy + 'static) -> Self {
        self.device_mapper = Box::new(strategy);
        self
    }

    pub fn with_generic(mut self, strategy: impl StatStrategy + 'static) -> Self {
        self.generic = Box::new(strategy);
        self
    }

    pub fn get(&self, kind: StatKind) -> &dyn StatStrategy {
        match kind {
            StatKind::Zfs => self.zfs.as_ref(),
            StatKind::DeviceMapper => self.device_mapper.as_ref(),
            StatKind::Generic => self.generic.as_ref(),
        }
    }
}

/// Runs a tool to completion and returns its standard output.
pub(super) fn run_tool(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| Error::Spawn {
            program: program.to_owned(),
            source,
        })?;

    if !output.status.success() {
        return Err(Error::CommandFailed {
            program: program.to_owned(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parses one unsigned number from a tool's output.
pub(super) fn parse_number(program: &str, value: &str) -> Result<u64> {
    value.trim().parse().map_err(|source| Error::InvalidNumber {
        program: program.to_owned(),
        value: value.to_owned(),
        source,
    })
}
