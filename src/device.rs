//! Block device identity: device paths and kernel major/minor numbers.
//!
//! The packed device number layout reproduced here is the legacy Linux `dev_t`
//! encoding (12-bit major, 20-bit minor split around it). Both the partition
//! cache and [`crate::service::FsInfoService::get_dir_fs_device`] key devices
//! by the decoded pair, so the two must agree bit for bit.

use std::path::Path;
use std::sync::LazyLock;

use nix::sys::stat::FileStat;
use regex::Regex;

/// Directory under which short kernel device names are resolved.
pub const DEVICE_DIR: &str = "/dev";

/// Short device names tracked by this crate: SCSI / Xen virtual disks and their
/// partitions (`sda`, `sdb1`, `xvda2`) and device-mapper nodes (`dm-0`).
static DEVICE_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:s|xv)d[a-z]+\d*|dm-\d+)$").expect("device name pattern is valid")
});

/// Identity of a block device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct DeviceInfo {
    /// Absolute device path, e.g. `/dev/sdb1`.
    pub device: String,
    pub major: u32,
    pub minor: u32,
}

impl DeviceInfo {
    pub fn new(device: impl Into<String>, major: u32, minor: u32) -> Self {
        Self {
            device: device.into(),
            major,
            minor,
        }
    }
}

/// Extracts the major number from a packed device number.
#[inline]
pub fn major(dev: u64) -> u32 {
    ((dev >> 8) & 0xfff) as u32
}

/// Extracts the minor number from a packed device number.
#[inline]
pub fn minor(dev: u64) -> u32 {
    ((dev & 0xff) | ((dev >> 12) & 0xfff00)) as u32
}

/// Packs a major/minor pair; the inverse of [`major`] and [`minor`].
#[inline]
pub fn makedev(major: u32, minor: u32) -> u64 {
    let (major, minor) = (u64::from(major), u64::from(minor));
    ((minor & 0xfff00) << 12) | ((major & 0xfff) << 8) | (minor & 0xff)
}

/// Packed number of the device holding the file described by `stat`.
#[allow(clippy::useless_conversion)]
pub fn dev_of(stat: &FileStat) -> u64 {
    u64::from(stat.st_dev)
}

/// Packed number of the device node described by `stat`.
#[allow(clippy::useless_conversion)]
pub fn rdev_of(stat: &FileStat) -> u64 {
    u64::from(stat.st_rdev)
}

/// Returns `true` if `name` is a short device name this crate tracks.
pub fn is_tracked_device_name(name: &str) -> bool {
    DEVICE_NAME_PATTERN.is_match(name)
}

/// Returns `true` if `path` is a node directly under [`DEVICE_DIR`] with a
/// tracked device name.
pub fn is_tracked_device_path(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    path.parent() == Some(Path::new(DEVICE_DIR))
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(is_tracked_device_name)
}

/// Turns a short kernel device name (`sdb1`) into its absolute path (`/dev/sdb1`).
pub fn device_path(name: &str) -> String {
    Path::new(DEVICE_DIR).join(name).to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_example_device_number() {
        assert_eq!(major(0x0801), 8);
        assert_eq!(minor(0x0801), 1);
    }

    #[test]
    fn test_decode_large_minor() {
        // minor 0x12345: low byte in bits 0..8, the rest above the major
        let dev = 0x12300 << 12 | 0xfd << 8 | 0x45;
        assert_eq!(major(dev), 0xfd);
        assert_eq!(minor(dev), 0x12345);
    }

    #[test]
    fn test_makedev_round_trip() {
        for (maj, min) in [(8, 17), (253, 0), (259, 1), (0xfff, 0xfffff), (0, 0)] {
            let dev = makedev(maj, min);
            assert_eq!(major(dev), maj);
            assert_eq!(minor(dev), min);
        }
        assert_eq!(makedev(8, 1), 0x0801);
    }

    #[test]
    fn test_tracked_device_names() {
        for name in ["sda", "sdb1", "sdaa12", "xvda", "xvdf3", "dm-0", "dm-12"] {
            assert!(is_tracked_device_name(name), "{name} should match");
        }
        for name in ["loop0", "nvme0n1p1", "dm-", "sd", "sda1a", "tmpfs", "vda1", "md0"] {
            assert!(!is_tracked_device_name(name), "{name} should not match");
        }
    }

    #[test]
    fn test_tracked_device_path() {
        assert!(is_tracked_device_path("/dev/sdb1"));
        assert!(is_tracked_device_path("/dev/dm-3"));
        assert!(!is_tracked_device_path("/dev/mapper/vg-root"));
        assert!(!is_tracked_device_path("overlay"));
        assert!(!is_tracked_device_path("sdb1"));
        assert!(!is_tracked_device_path("/srv/images/sdb1"));
        assert!(!is_tracked_device_path("/dev/disk/sdb1"));
    }

    #[test]
    fn test_dev_of_matches_metadata() {
        use std::os::unix::fs::MetadataExt;

        let dir = tempfile::tempdir().unwrap();
        let stat = nix::sys::stat::stat(dir.path()).unwrap();
        let meta = std::fs::metadata(dir.path()).unwrap();
        assert_eq!(dev_of(&stat), meta.dev());
        assert_eq!(rdev_of(&stat), meta.rdev());
    }

    #[test]
    fn test_device_path() {
        assert_eq!(device_path("sdd2"), "/dev/sdd2");
    }
}
