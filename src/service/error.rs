use std::path::PathBuf;

use crate::{diskstats, partition, usage};

/// Errors surfaced by [`super::FsInfoService`].
///
/// Statistics failures never appear here: enumeration logs and skips them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Partition(#[from] partition::Error),

    #[error(transparent)]
    DiskStats(#[from] diskstats::Error),

    #[error(transparent)]
    Usage(#[from] usage::Error),

    #[error("failed to stat directory `{path}`: {source}")]
    DirStat {
        path: PathBuf,
        #[source]
        source: nix::errno::Errno,
    },
}

impl Error {
    /// Returns `true` for partition, major:minor or label cache misses.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Partition(err) if err.is_not_found())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
