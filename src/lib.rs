//! fsinfo: filesystem inventory for Linux hosts.
//!
//! This library discovers the block devices worth monitoring from the host's
//! mount table, reports their capacity and inode usage (generic `statvfs`, ZFS
//! datasets and devicemapper thin pools), merges kernel I/O counters, resolves
//! directories and labels to devices and measures directory usage with a
//! bounded `du` run. [`service::FsInfoService`] is the entry point.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::path::PathBuf;

use error::ResultOkLogExt;
use serde::Serialize;

pub mod config;
pub mod device;
pub mod diskstats;
pub mod error;
pub mod fsutil;
pub mod mountinfo;
pub mod partition;
pub mod service;
pub mod stats;
pub mod usage;

pub use device::DeviceInfo;
pub use service::{Fs, FsInfoService};

/// Inventory printed by the `fsinfo` binary.
#[derive(Debug, Serialize)]
pub struct Report {
    pub filesystems: Vec<Fs>,
    /// Label to device path.
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir_usage: Option<DirUsage>,
}

#[derive(Debug, Serialize)]
pub struct DirUsage {
    pub dir: PathBuf,
    pub bytes: u64,
}

/// Runs the `fsinfo` binary: discovers partitions, collects the inventory and
/// prints it to stdout as JSON.
///
/// # Errors
///
/// Possible errors include:
/// - Invalid `FSINFO_*` environment variables.
/// - Failure to read the mount table.
/// - A malformed I/O statistics table when I/O statistics are requested.
///
/// A failing directory usage measurement is only logged.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::from_env()?;
    log::debug!("configuration: {config:?}");

    let service =
        FsInfoService::new(config.mount_source())?.with_diskstats_path(&config.diskstats_path);

    let filesystems = service.get_global_fs_info(config.with_io_stats)?;

    let mut labels = BTreeMap::new();
    let Ok(()) = service.partitions().apply_over_labels(|label, device| {
        labels.insert(label.to_owned(), device.to_owned());
        Ok::<_, Infallible>(())
    });

    let dir_usage = match config.usage_dir {
        Some(dir) => service
            .get_dir_usage(&dir, config.usage_timeout)
            .await
            .ok_log()
            .map(|bytes| DirUsage { dir, bytes }),
        None => None,
    };

    let report = Report {
        filesystems,
        labels,
        dir_usage,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
