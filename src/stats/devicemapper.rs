use crate::partition::Partition;

use super::strategy::{parse_number, run_tool};
use super::{Error, FsType, FsUsage, Result, StatStrategy};

const DMSETUP_PROGRAM: &str = "dmsetup";

/// Index of the `used/total` data blocks column in a `thin-pool` status line:
/// `<start> <length> thin-pool <transaction id> <meta used/total> <data used/total> ...`
const DATA_BLOCKS_COLUMN: usize = 5;

/// Reads thin pool usage through `dmsetup status <pool>`.
///
/// Block counts are converted to bytes with the partition's block size, which
/// discovery takes from the runtime's driver status.
#[derive(Debug, Clone)]
pub struct ThinPoolStrategy {
    program: String,
}

impl Default for ThinPoolStrategy {
    fn default() -> Self {
        Self {
            program: DMSETUP_PROGRAM.to_owned(),
        }
    }
}

impl ThinPoolStrategy {
    /// Uses `program` instead of `dmsetup` from `PATH`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl StatStrategy for ThinPoolStrategy {
    fn stat(&self, device: &str, partition: &Partition) -> Result<FsUsage> {
        if partition.block_size == 0 {
            return Err(Error::MissingBlockSize {
                device: device.to_owned(),
            });
        }

        let output = run_tool(&self.program, &["status", device])?;
        pool_usage(&self.program, &output, partition.block_size)
    }
}

/// Converts a thin-pool status line to bytes using `block_size`.
fn pool_usage(program: &str, output: &str, block_size: u64) -> Result<FsUsage> {
    let (used, total) = parse_data_blocks(program, output)?;
    let overflow = || Error::UnexpectedOutput {
        program: program.to_owned(),
        output: output.trim().to_owned(),
    };
    let capacity = total.checked_mul(block_size).ok_or_else(overflow)?;
    let free = total
        .saturating_sub(used)
        .checked_mul(block_size)
        .ok_or_else(overflow)?;

    Ok(FsUsage {
        fs_type: FsType::DeviceMapper,
        capacity,
        free,
        available: free,
        inodes: 0,
        inodes_free: 0,
    })
}

/// Extracts `(used, total)` data blocks from a thin-pool status line.
fn parse_data_blocks(program: &str, output: &str) -> Result<(u64, u64)> {
    let unexpected = || Error::UnexpectedOutput {
        program: program.to_owned(),
        output: output.trim().to_owned(),
    };

    let fields: Vec<&str> = output.split_whitespace().collect();
    if fields.get(2) != Some(&"thin-pool") {
        return Err(unexpected());
    }
    let (used, total) = fields
        .get(DATA_BLOCKS_COLUMN)
        .and_then(|blocks| blocks.split_once('/'))
        .ok_or_else(unexpected)?;

    Ok((parse_number(program, used)?, parse_number(program, total)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn pool(block_size: u64) -> Partition {
        Partition {
            mountpoint: PathBuf::new(),
            major: 253,
            minor: 2,
            fs_type: "devicemapper".to_owned(),
            block_size,
        }
    }

    #[test]
    fn test_parse_data_blocks() {
        let status = "0 209715200 thin-pool 71 2383/524288 52193/1638400 - rw discard_passdown queue_if_no_space - 1024\n";
        assert_eq!(
            parse_data_blocks("dmsetup", status).unwrap(),
            (52_193, 1_638_400)
        );
    }

    #[test]
    fn test_pool_usage() {
        let status = "0 209715200 thin-pool 71 2383/524288 100/400 - rw - 1024\n";
        let usage = pool_usage("dmsetup", status, 65_536).unwrap();
        assert_eq!(usage.capacity, 400 * 65_536);
        assert_eq!(usage.free, 300 * 65_536);
        assert_eq!(usage.available, usage.free);
        assert_eq!(usage.fs_type, FsType::DeviceMapper);
    }

    #[test]
    fn test_pool_usage_overflow() {
        let status = format!("0 1 thin-pool 1 1/1 0/{} - rw\n", u64::MAX / 2);
        assert!(matches!(
            pool_usage("dmsetup", &status, 65_536),
            Err(Error::UnexpectedOutput { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_other_targets() {
        let status = "0 409600 linear \n";
        assert!(matches!(
            parse_data_blocks("dmsetup", status),
            Err(Error::UnexpectedOutput { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_malformed_blocks() {
        let status = "0 209715200 thin-pool 71 2383/524288 lots\n";
        assert!(matches!(
            parse_data_blocks("dmsetup", status),
            Err(Error::UnexpectedOutput { .. })
        ));
        let status = "0 209715200 thin-pool 71 2383/524288 x/10\n";
        assert!(matches!(
            parse_data_blocks("dmsetup", status),
            Err(Error::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_missing_block_size_fails_before_running_tool() {
        let strategy = ThinPoolStrategy::with_program("/definitely/not/dmsetup");
        let err = strategy.stat("docker-pool", &pool(0)).unwrap_err();
        assert!(matches!(err, Error::MissingBlockSize { .. }));
    }

    #[test]
    fn test_missing_tool() {
        let strategy = ThinPoolStrategy::with_program("/definitely/not/dmsetup");
        let err = strategy.stat("docker-pool", &pool(65_536)).unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }
}
