use std::path::PathBuf;

use crate::mountinfo;

/// Errors raised by partition discovery and partition cache lookups.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("partition for device `{device}` not found")]
    DeviceNotFound { device: String },

    #[error("no device found for major:minor {major}:{minor}")]
    MajorMinorNotFound { major: u32, minor: u32 },

    #[error("no device found for label `{label}`")]
    LabelNotFound { label: String },

    #[error("failed to read mount table: {0}")]
    MountTable(#[from] mountinfo::Error),

    #[error("failed to read label directory `{path}`: {source}")]
    LabelDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Returns `true` for cache misses, as opposed to discovery failures.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::DeviceNotFound { .. } | Error::MajorMinorNotFound { .. } | Error::LabelNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
