use crate::partition::Partition;

use super::strategy::{parse_number, run_tool};
use super::{Error, FsType, FsUsage, Result, StatStrategy};

const ZFS_PROGRAM: &str = "zfs";

/// Reads dataset usage through `zfs get`. The device is the dataset name
/// (e.g. `tank/home`), which is the mount source the kernel reports.
#[derive(Debug, Clone)]
pub struct ZfsStrategy {
    program: String,
}

impl Default for ZfsStrategy {
    fn default() -> Self {
        Self {
            program: ZFS_PROGRAM.to_owned(),
        }
    }
}

impl ZfsStrategy {
    /// Uses `program` instead of `zfs` from `PATH`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl StatStrategy for ZfsStrategy {
    fn stat(&self, device: &str, _partition: &Partition) -> Result<FsUsage> {
        let output = run_tool(
            &self.program,
            &["get", "-Hp", "-o", "value", "used,available", device],
        )?;
        dataset_usage(&self.program, &output)
    }
}

/// Builds usage from `zfs get` output; capacity is `used + available`.
fn dataset_usage(program: &str, output: &str) -> Result<FsUsage> {
    let (used, available) = parse_used_available(program, output)?;
    let capacity = used
        .checked_add(available)
        .ok_or_else(|| Error::UnexpectedOutput {
            program: program.to_owned(),
            output: output.to_owned(),
        })?;

    Ok(FsUsage {
        fs_type: FsType::Zfs,
        capacity,
        free: available,
        available,
        inodes: 0,
        inodes_free: 0,
    })
}

/// Parses the two value lines printed for `used,available`.
fn parse_used_available(program: &str, output: &str) -> Result<(u64, u64)> {
    let mut lines = output.lines().filter(|line| !line.trim().is_empty());
    match (lines.next(), lines.next(), lines.next()) {
        (Some(used), Some(available), None) => Ok((
            parse_number(program, used)?,
            parse_number(program, available)?,
        )),
        _ => Err(Error::UnexpectedOutput {
            program: program.to_owned(),
            output: output.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn dataset() -> Partition {
        Partition {
            mountpoint: PathBuf::from("/tank/home"),
            major: 0,
            minor: 50,
            fs_type: "zfs".to_owned(),
            block_size: 0,
        }
    }

    #[test]
    fn test_parse_used_available() {
        assert_eq!(
            parse_used_available("zfs", "1048576\n3145728\n").unwrap(),
            (1_048_576, 3_145_728)
        );
    }

    #[test]
    fn test_dataset_usage() {
        let usage = dataset_usage("zfs", "1048576\n3145728\n").unwrap();
        assert_eq!(usage.capacity, 4_194_304);
        assert_eq!(usage.free, 3_145_728);
        assert_eq!(usage.available, 3_145_728);
        assert_eq!(usage.fs_type, FsType::Zfs);
    }

    #[test]
    fn test_dataset_usage_overflow() {
        let output = format!("{}\n1\n", u64::MAX);
        assert!(matches!(
            dataset_usage("zfs", &output),
            Err(Error::UnexpectedOutput { .. })
        ));
    }

    #[test]
    fn test_parse_used_available_wrong_line_count() {
        for output in ["", "1\n", "1\n2\n3\n"] {
            assert!(matches!(
                parse_used_available("zfs", output),
                Err(Error::UnexpectedOutput { .. })
            ));
        }
    }

    #[test]
    fn test_stat_without_zfs_tooling() {
        let strategy = ZfsStrategy::with_program("/definitely/not/zfs");
        let err = strategy.stat("tank/home", &dataset()).unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }
}
