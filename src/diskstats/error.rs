use std::num::ParseIntError;
use std::path::PathBuf;

use crate::fsutil;

/// Errors raised while parsing a kernel I/O statistics table.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    FileOpen(#[from] fsutil::FileOpenError),

    #[error("failed to read line for file `{path}`: {source}")]
    ReadLine {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "could not parse all {expected} columns for device `{device}` at line {line}: found {found}"
    )]
    MissingFields {
        device: String,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid counter for device `{device}` at line {line}: '{value}': {source}")]
    InvalidValue {
        device: String,
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
