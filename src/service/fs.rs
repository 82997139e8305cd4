use std::collections::HashSet;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::device::{self, DeviceInfo};
use crate::diskstats::{self, DEFAULT_DISKSTATS_PATH, DiskStats};
use crate::error::ResultOkLogExt;
use crate::partition::{MountSource, Partition, PartitionCache};
use crate::stats::{FsStatsCache, FsType, FsUsage};
use crate::usage::DirectoryUsageProbe;

use super::{Error, Result};

/// Usage report for one tracked filesystem.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Fs {
    #[serde(flatten)]
    pub device_info: DeviceInfo,
    #[serde(rename = "type")]
    pub fs_type: FsType,
    pub capacity: u64,
    pub free: u64,
    pub available: u64,
    pub inodes: u64,
    pub inodes_free: u64,
    /// Present only when I/O statistics were requested and the kernel reports
    /// the device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_stats: Option<DiskStats>,
}

impl Fs {
    fn new(device_info: DeviceInfo, usage: FsUsage) -> Self {
        Self {
            device_info,
            fs_type: usage.fs_type,
            capacity: usage.capacity,
            free: usage.free,
            available: usage.available,
            inodes: usage.inodes,
            inodes_free: usage.inodes_free,
            disk_stats: None,
        }
    }
}

/// Answers filesystem inventory queries for the host.
///
/// The service owns a [`PartitionCache`] (what is mounted where) and a
/// [`FsStatsCache`] (how full it is). Both are refreshed or cleared only on
/// request; I/O counters are read fresh on every query that asks for them.
#[derive(Debug)]
pub struct FsInfoService {
    partitions: PartitionCache,
    stats: FsStatsCache,
    diskstats_path: PathBuf,
    usage_probe: DirectoryUsageProbe,
}

impl FsInfoService {
    /// Creates a service over `source` with the default statistics strategies.
    ///
    /// # Errors
    ///
    /// Fails if the initial partition discovery fails.
    pub fn new(source: impl MountSource + 'static) -> Result<Self> {
        Self::with_parts(PartitionCache::new(source), FsStatsCache::default())
    }

    /// Creates a service from pre-built caches and populates the partition cache.
    ///
    /// # Errors
    ///
    /// Fails if the initial partition discovery fails.
    pub fn with_parts(partitions: PartitionCache, stats: FsStatsCache) -> Result<Self> {
        partitions.refresh()?;
        let service = Self {
            partitions,
            stats,
            diskstats_path: PathBuf::from(DEFAULT_DISKSTATS_PATH),
            usage_probe: DirectoryUsageProbe::default(),
        };
        service.log_partitions();
        Ok(service)
    }

    /// Overrides where I/O counters are read from.
    pub fn with_diskstats_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.diskstats_path = path.into();
        self
    }

    /// Overrides the command used by [`get_dir_usage`](Self::get_dir_usage).
    pub fn with_usage_probe(mut self, probe: DirectoryUsageProbe) -> Self {
        self.usage_probe = probe;
        self
    }

    pub fn partitions(&self) -> &PartitionCache {
        &self.partitions
    }

    fn log_partitions(&self) {
        log::info!("filesystem partitions:");
        let Ok(()) = self.partitions.apply_over_partitions(|device, partition| {
            log::info!("\t{device}: {partition:?}");
            Ok::<_, Infallible>(())
        });
    }

    /// Reports every tracked filesystem.
    ///
    /// # Errors
    ///
    /// Only reading I/O counters can fail; a filesystem whose statistics
    /// cannot be computed is logged and left out.
    pub fn get_global_fs_info(&self, with_io_stats: bool) -> Result<Vec<Fs>> {
        self.filtered_fs_info(with_io_stats, |_, _| true)
    }

    /// Reports the tracked filesystems mounted at one of `mountpoints`.
    ///
    /// # Errors
    ///
    /// See [`get_global_fs_info`](Self::get_global_fs_info).
    pub fn get_fs_info_for_mounts(
        &self,
        mountpoints: &HashSet<PathBuf>,
        with_io_stats: bool,
    ) -> Result<Vec<Fs>> {
        self.filtered_fs_info(with_io_stats, |_, partition| {
            mountpoints.contains(&partition.mountpoint)
        })
    }

    /// Reports the tracked filesystems whose device path is in `devices`.
    ///
    /// # Errors
    ///
    /// See [`get_global_fs_info`](Self::get_global_fs_info).
    pub fn get_fs_info_for_devices(
        &self,
        devices: &HashSet<String>,
        with_io_stats: bool,
    ) -> Result<Vec<Fs>> {
        self.filtered_fs_info(with_io_stats, |device, _| devices.contains(device))
    }

    fn filtered_fs_info(
        &self,
        with_io_stats: bool,
        keep: impl Fn(&str, &Partition) -> bool,
    ) -> Result<Vec<Fs>> {
        let mut filesystems = Vec::new();
        let Ok(()) = self
            .partitions
            .apply_over_partitions(|device, partition| {
                if !keep(device, partition) {
                    return Ok::<_, Infallible>(());
                }
                match self.stats.fs_stats(device, partition) {
                    Ok(usage) => filesystems.push(Fs::new(
                        DeviceInfo::new(device, partition.major, partition.minor),
                        usage,
                    )),
                    Err(err) => log::error!("stat failed on {device} with error: {err}"),
                }
                Ok(())
            });

        if with_io_stats {
            let counters = diskstats::parse(&self.diskstats_path)?;
            for fs in &mut filesystems {
                fs.disk_stats = counters.get(&fs.device_info.device).copied();
            }
        }

        Ok(filesystems)
    }

    /// Returns the tracked device holding `dir`.
    ///
    /// # Errors
    ///
    /// - [`Error::DirStat`] if `dir` cannot be stat'd.
    /// - A not-found partition error if its device is not tracked.
    pub fn get_dir_fs_device(&self, dir: impl AsRef<Path>) -> Result<DeviceInfo> {
        let dir = dir.as_ref();
        let stat = nix::sys::stat::stat(dir).map_err(|source| Error::DirStat {
            path: dir.to_path_buf(),
            source,
        })?;

        let dev = device::dev_of(&stat);
        Ok(self
            .partitions
            .device_info_for_major_minor(device::major(dev), device::minor(dev))?)
    }

    /// Returns the number of bytes used by `dir`, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Any [`crate::usage::Error`], including a timeout.
    pub async fn get_dir_usage(&self, dir: impl AsRef<Path>, timeout: Duration) -> Result<u64> {
        Ok(self.usage_probe.measure(dir, timeout).await?)
    }

    /// Resolves a filesystem label to its device path.
    ///
    /// # Errors
    ///
    /// A not-found partition error if the label is unknown.
    pub fn get_device_for_label(&self, label: &str) -> Result<String> {
        Ok(self.partitions.device_name_for_label(label)?)
    }

    /// Returns every label pointing at `device`, in label order.
    pub fn get_labels_for_device(&self, device: &str) -> Vec<String> {
        let mut labels = Vec::new();
        let Ok(()) = self.partitions.apply_over_labels(|label, labeled| {
            if labeled == device {
                labels.push(label.to_owned());
            }
            Ok::<_, Infallible>(())
        });
        labels
    }

    /// Returns where `device` is mounted.
    ///
    /// # Errors
    ///
    /// A not-found partition error if the device is not tracked.
    pub fn get_mountpoint_for_device(&self, device: &str) -> Result<PathBuf> {
        Ok(self.partitions.partition_for_device(device)?.mountpoint)
    }

    /// Re-discovers partitions, keeping the previous set if discovery fails.
    ///
    /// The failure is only logged; use [`try_refresh_cache`](Self::try_refresh_cache)
    /// to observe it.
    pub fn refresh_cache(&self) {
        self.try_refresh_cache()
            .ok_warn("failed to refresh filesystem partition cache");
    }

    /// Re-discovers partitions and reports a discovery failure to the caller.
    ///
    /// # Errors
    ///
    /// The discovery error; the previous partition set is still served.
    pub fn try_refresh_cache(&self) -> Result<()> {
        self.partitions.refresh()?;
        self.log_partitions();
        Ok(())
    }

    /// Drops cached filesystem statistics so the next query recomputes them.
    pub fn clear_stats(&self) {
        self.stats.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{self, Discovery};
    use crate::stats::{self, StatStrategy, Strategies};
    use std::io::Write;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Serves a fixed discovery result, or fails while `fail` is set.
    struct FixedSource {
        discovery: Discovery,
        fail: Arc<AtomicBool>,
    }

    impl MountSource for FixedSource {
        fn discover(&self) -> partition::Result<Discovery> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(partition::Error::LabelDir {
                    path: PathBuf::from("/dev/disk/by-label"),
                    source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                });
            }
            Ok(self.discovery.clone())
        }
    }

    /// Reports the same numbers for every device except `/dev/sdc1`.
    struct FixedStats;

    impl StatStrategy for FixedStats {
        fn stat(&self, device: &str, partition: &Partition) -> stats::Result<FsUsage> {
            if device == "/dev/sdc1" {
                return Err(stats::Error::Statvfs {
                    path: partition.mountpoint.clone(),
                    source: nix::errno::Errno::EIO,
                });
            }
            Ok(FsUsage {
                fs_type: FsType::Vfs,
                capacity: 1000,
                free: 400,
                available: 380,
                inodes: 100,
                inodes_free: 60,
            })
        }
    }

    fn mounted(mountpoint: &str, major: u32, minor: u32) -> Partition {
        Partition {
            mountpoint: PathBuf::from(mountpoint),
            major,
            minor,
            fs_type: "ext4".to_owned(),
            block_size: 0,
        }
    }

    fn discovery() -> Discovery {
        Discovery {
            partitions: vec![
                ("/dev/sda1".to_owned(), mounted("/", 8, 1)),
                ("/dev/sdb1".to_owned(), mounted("/data", 8, 17)),
                ("/dev/sdc1".to_owned(), mounted("/broken", 8, 33)),
            ],
            labels: vec![
                ("data".to_owned(), "/dev/sdb1".to_owned()),
                ("root".to_owned(), "/dev/sda1".to_owned()),
                ("scratch".to_owned(), "/dev/sdb1".to_owned()),
            ],
        }
    }

    fn service_with(discovery: Discovery) -> (FsInfoService, Arc<AtomicBool>) {
        let fail = Arc::new(AtomicBool::new(false));
        let source = FixedSource {
            discovery,
            fail: Arc::clone(&fail),
        };
        let service = FsInfoService::with_parts(
            PartitionCache::new(source),
            FsStatsCache::new(Strategies::default().with_generic(FixedStats)),
        )
        .unwrap()
        .with_diskstats_path("/definitely/not/diskstats");
        (service, fail)
    }

    fn service() -> FsInfoService {
        service_with(discovery()).0
    }

    fn sdb1_record() -> Fs {
        Fs {
            device_info: DeviceInfo::new("/dev/sdb1", 8, 17),
            fs_type: FsType::Vfs,
            capacity: 1000,
            free: 400,
            available: 380,
            inodes: 100,
            inodes_free: 60,
            disk_stats: None,
        }
    }

    #[test]
    fn test_fs_info_for_mounts() {
        let mounts = HashSet::from([PathBuf::from("/data")]);
        let filesystems = service().get_fs_info_for_mounts(&mounts, false).unwrap();
        assert_eq!(filesystems, vec![sdb1_record()]);
    }

    #[test]
    fn test_fs_info_for_devices() {
        let devices = HashSet::from(["/dev/sda1".to_owned(), "/dev/nope".to_owned()]);
        let filesystems = service().get_fs_info_for_devices(&devices, false).unwrap();
        assert_eq!(filesystems.len(), 1);
        assert_eq!(filesystems[0].device_info, DeviceInfo::new("/dev/sda1", 8, 1));
    }

    #[test]
    fn test_global_fs_info_skips_failed_stats() {
        let filesystems = service().get_global_fs_info(false).unwrap();
        let devices: Vec<_> = filesystems
            .iter()
            .map(|fs| fs.device_info.device.as_str())
            .collect();
        assert_eq!(devices, ["/dev/sda1", "/dev/sdb1"]);
    }

    #[test]
    fn test_io_stats_are_merged_by_device() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "   8       1 sda1 9 9 9 9 9 9 9 9 9 9 9").unwrap();
        writeln!(file, "   8      17 sdb1 1 2 3 4 5 6 7 8 0 10 11").unwrap();
        writeln!(file, "   7       0 loop0 1 1 1 1 1 1 1 1 1 1 1").unwrap();

        let service = service().with_diskstats_path(file.path());
        let mounts = HashSet::from([PathBuf::from("/data")]);
        let filesystems = service.get_fs_info_for_mounts(&mounts, true).unwrap();

        let expected = DiskStats::from([1, 2, 3, 4, 5, 6, 7, 8, 0, 10, 11]);
        assert_eq!(filesystems.len(), 1);
        assert_eq!(filesystems[0].disk_stats, Some(expected));
    }

    #[test]
    fn test_io_stats_missing_source_leaves_records_bare() {
        let filesystems = service().get_global_fs_info(true).unwrap();
        assert_eq!(filesystems.len(), 2);
        assert!(filesystems.iter().all(|fs| fs.disk_stats.is_none()));
    }

    #[test]
    fn test_malformed_io_stats_fail_the_query() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "   8      17 sdb1 1 2 3 4 5 6 7 8 9 10").unwrap();

        let service = service().with_diskstats_path(file.path());
        let err = service.get_global_fs_info(true).unwrap_err();
        assert!(matches!(err, Error::DiskStats(_)));
        assert!(service.get_global_fs_info(false).is_ok());
    }

    #[test]
    fn test_dir_fs_device() {
        let dir = tempfile::tempdir().unwrap();
        let dev = device::dev_of(&nix::sys::stat::stat(dir.path()).unwrap());
        let (major, minor) = (device::major(dev), device::minor(dev));

        let (service, _) = service_with(Discovery {
            partitions: vec![("/dev/sdz9".to_owned(), mounted("/tmp", major, minor))],
            labels: Vec::new(),
        });

        let info = service.get_dir_fs_device(dir.path()).unwrap();
        assert_eq!(info, DeviceInfo::new("/dev/sdz9", major, minor));
    }

    #[test]
    fn test_dir_fs_device_errors() {
        let (service, _) = service_with(Discovery::default());

        let err = service
            .get_dir_fs_device("/definitely/does/not/exist")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::DirStat {
                source: nix::errno::Errno::ENOENT,
                ..
            }
        ));

        let dir = tempfile::tempdir().unwrap();
        let err = service.get_dir_fs_device(dir.path()).unwrap_err();
        assert!(err.is_not_found(), "unexpected error: {err}");
    }

    #[test]
    fn test_label_lookups() {
        let service = service();
        assert_eq!(service.get_device_for_label("root").unwrap(), "/dev/sda1");
        assert!(service.get_device_for_label("missing").unwrap_err().is_not_found());

        assert_eq!(service.get_labels_for_device("/dev/sdb1"), ["data", "scratch"]);
        assert!(service.get_labels_for_device("/dev/sdc1").is_empty());
    }

    #[test]
    fn test_mountpoint_for_device() {
        let service = service();
        assert_eq!(
            service.get_mountpoint_for_device("/dev/sdb1").unwrap(),
            PathBuf::from("/data")
        );
        assert!(
            service
                .get_mountpoint_for_device("/dev/sdq1")
                .unwrap_err()
                .is_not_found()
        );
    }

    #[test]
    fn test_failed_refresh_keeps_previous_partitions() {
        let (service, fail) = service_with(discovery());
        fail.store(true, Ordering::SeqCst);

        service.refresh_cache();
        assert!(matches!(
            service.try_refresh_cache().unwrap_err(),
            Error::Partition(partition::Error::LabelDir { .. })
        ));
        assert_eq!(service.partitions().snapshot().len(), 3);

        fail.store(false, Ordering::SeqCst);
        service.try_refresh_cache().unwrap();
        assert_eq!(service.partitions().snapshot().len(), 3);
    }

    #[test]
    fn test_initial_discovery_failure() {
        let source = FixedSource {
            discovery: discovery(),
            fail: Arc::new(AtomicBool::new(true)),
        };
        assert!(FsInfoService::new(source).is_err());
    }

    #[test]
    fn test_fs_json_shape() {
        let json = serde_json::to_value(sdb1_record()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "device": "/dev/sdb1",
                "major": 8,
                "minor": 17,
                "type": "vfs",
                "capacity": 1000,
                "free": 400,
                "available": 380,
                "inodes": 100,
                "inodes_free": 60,
            })
        );
    }

    #[tokio::test]
    async fn test_dir_usage() {
        let service = service().with_usage_probe(DirectoryUsageProbe::new(
            "sh",
            ["-c", r#"echo "8 $0""#],
        ));
        let dir = tempfile::tempdir().unwrap();

        let bytes = service
            .get_dir_usage(dir.path(), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(bytes, 8 * 1024);

        let err = service
            .get_dir_usage("", Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Usage(crate::usage::Error::EmptyDirectory)));
    }
}
