use std::num::ParseIntError;
use std::path::PathBuf;
use std::process::ExitStatus;

/// Errors raised while computing filesystem statistics for one device.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("statvfs failed on `{path}`: {source}")]
    Statvfs {
        path: PathBuf,
        #[source]
        source: nix::errno::Errno,
    },

    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("unexpected output from `{program}`: `{output}`")]
    UnexpectedOutput { program: String, output: String },

    #[error("invalid number '{value}' in output of `{program}`: {source}")]
    InvalidNumber {
        program: String,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("unknown block size for thin pool `{device}`")]
    MissingBlockSize { device: String },
}

pub type Result<T> = std::result::Result<T, Error>;
