use std::num::ParseIntError;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

/// Errors raised while measuring directory usage.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid directory: empty path")]
    EmptyDirectory,

    #[error("failed to set up {stream} for `{command}`")]
    Pipe {
        command: String,
        stream: &'static str,
    },

    #[error("failed to exec `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` timed out after {timeout:?} on `{dir}`")]
    Timeout {
        command: String,
        dir: PathBuf,
        timeout: Duration,
    },

    #[error("failed to kill `{command}` after timeout: {source}")]
    Kill {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed on `{dir}` with {status}, stdout: {stdout}, stderr: {stderr}")]
    Failed {
        command: String,
        dir: PathBuf,
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },

    #[error("cannot parse output of `{command}`: `{output}`")]
    Output {
        command: String,
        output: String,
        #[source]
        source: Option<ParseIntError>,
    },
}

impl Error {
    /// Returns `true` if the command was killed for exceeding its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
