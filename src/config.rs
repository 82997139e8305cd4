//! Environment-driven configuration of the `fsinfo` binary.
//!
//! | Variable                     | Default                  |
//! |------------------------------|--------------------------|
//! | `FSINFO_MOUNTINFO`           | `/proc/self/mountinfo`   |
//! | `FSINFO_DISKSTATS`           | `/proc/diskstats`        |
//! | `FSINFO_LABEL_DIR`           | `/dev/disk/by-label`     |
//! | `FSINFO_RUNTIME_ROOT`        | unset                    |
//! | `FSINFO_RUNTIME_DRIVER`      | empty                    |
//! | `FSINFO_THIN_POOL_NAME`      | unset                    |
//! | `FSINFO_THIN_POOL_BLOCKSIZE` | unset                    |
//! | `FSINFO_WITH_IO_STATS`       | `false`                  |
//! | `FSINFO_USAGE_DIR`           | unset                    |
//! | `FSINFO_USAGE_TIMEOUT_SECS`  | `60`                     |

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::diskstats::DEFAULT_DISKSTATS_PATH;
use crate::partition::{
    DEFAULT_LABEL_DIR, DEFAULT_MOUNTINFO_PATH, HostMountSource, POOL_BLOCK_SIZE_KEY,
    POOL_NAME_KEY, RuntimeContext,
};

pub const MOUNTINFO_VAR: &str = "FSINFO_MOUNTINFO";
pub const DISKSTATS_VAR: &str = "FSINFO_DISKSTATS";
pub const LABEL_DIR_VAR: &str = "FSINFO_LABEL_DIR";
pub const RUNTIME_ROOT_VAR: &str = "FSINFO_RUNTIME_ROOT";
pub const RUNTIME_DRIVER_VAR: &str = "FSINFO_RUNTIME_DRIVER";
pub const THIN_POOL_NAME_VAR: &str = "FSINFO_THIN_POOL_NAME";
pub const THIN_POOL_BLOCK_SIZE_VAR: &str = "FSINFO_THIN_POOL_BLOCKSIZE";
pub const WITH_IO_STATS_VAR: &str = "FSINFO_WITH_IO_STATS";
pub const USAGE_DIR_VAR: &str = "FSINFO_USAGE_DIR";
pub const USAGE_TIMEOUT_VAR: &str = "FSINFO_USAGE_TIMEOUT_SECS";

pub const DEFAULT_USAGE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("environment variable `{var}` is not valid unicode")]
    NotUnicode { var: &'static str },

    #[error("environment variable `{var}` has invalid value `{value}`: expected {expected}")]
    InvalidValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone)]
pub struct Config {
    pub mountinfo_path: PathBuf,
    pub diskstats_path: PathBuf,
    pub label_dir: PathBuf,
    pub runtime: RuntimeContext,
    pub with_io_stats: bool,
    /// Directory whose usage is measured and reported, if any.
    pub usage_dir: Option<PathBuf>,
    pub usage_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mountinfo_path: PathBuf::from(DEFAULT_MOUNTINFO_PATH),
            diskstats_path: PathBuf::from(DEFAULT_DISKSTATS_PATH),
            label_dir: PathBuf::from(DEFAULT_LABEL_DIR),
            runtime: RuntimeContext::default(),
            with_io_stats: false,
            usage_dir: None,
            usage_timeout: DEFAULT_USAGE_TIMEOUT,
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Fails on non-unicode text values and on unparseable flags or numbers.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var_os(var))
    }

    /// Reads the configuration through `lookup`; unset variables keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Result<Self> {
        let text = |var: &'static str| -> Result<Option<String>> {
            lookup(var)
                .map(|value| value.into_string().map_err(|_| Error::NotUnicode { var }))
                .transpose()
        };
        let path = |var: &str| lookup(var).filter(|v| !v.is_empty()).map(PathBuf::from);

        let mut config = Self::default();
        if let Some(mountinfo) = path(MOUNTINFO_VAR) {
            config.mountinfo_path = mountinfo;
        }
        if let Some(diskstats) = path(DISKSTATS_VAR) {
            config.diskstats_path = diskstats;
        }
        if let Some(label_dir) = path(LABEL_DIR_VAR) {
            config.label_dir = label_dir;
        }
        config.usage_dir = path(USAGE_DIR_VAR);

        config.runtime.root = path(RUNTIME_ROOT_VAR);
        config.runtime.driver = text(RUNTIME_DRIVER_VAR)?.unwrap_or_default();
        for (var, key) in [
            (THIN_POOL_NAME_VAR, POOL_NAME_KEY),
            (THIN_POOL_BLOCK_SIZE_VAR, POOL_BLOCK_SIZE_KEY),
        ] {
            if let Some(value) = text(var)? {
                config.runtime.driver_status.insert(key.to_owned(), value);
            }
        }

        if let Some(raw) = text(WITH_IO_STATS_VAR)? {
            config.with_io_stats = parse_flag(&raw).ok_or(Error::InvalidValue {
                var: WITH_IO_STATS_VAR,
                value: raw.clone(),
                expected: "a boolean",
            })?;
        }
        if let Some(raw) = text(USAGE_TIMEOUT_VAR)? {
            let secs: u64 = raw.trim().parse().map_err(|_| Error::InvalidValue {
                var: USAGE_TIMEOUT_VAR,
                value: raw.clone(),
                expected: "a number of seconds",
            })?;
            config.usage_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Builds the host mount source described by this configuration.
    pub fn mount_source(&self) -> HostMountSource {
        HostMountSource::new(self.runtime.clone())
            .with_mountinfo_path(&self.mountinfo_path)
            .with_label_dir(&self.label_dir)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
