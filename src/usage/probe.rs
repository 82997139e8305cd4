use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::{Error, Result};

/// Measures the disk usage of a directory with an external `du`-style tool.
///
/// The directory is appended as the last argument. The tool must print the
/// usage in kilobytes as the first whitespace-separated field of its output.
#[derive(Debug, Clone)]
pub struct DirectoryUsageProbe {
    program: OsString,
    args: Vec<OsString>,
}

impl Default for DirectoryUsageProbe {
    /// `nice -n 19 du -s <dir>`
    fn default() -> Self {
        Self::new("nice", ["-n", "19", "du", "-s"])
    }
}

impl DirectoryUsageProbe {
    pub fn new<I, S>(program: impl Into<OsString>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the number of bytes used by `dir`.
    ///
    /// Standard output and standard error are drained while waiting for the
    /// tool. If it has not exited after `timeout` it is killed and reaped.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyDirectory`] if `dir` is empty; nothing is launched.
    /// - [`Error::Spawn`], [`Error::Pipe`], [`Error::Wait`] if the tool cannot be run.
    /// - [`Error::Timeout`] if the deadline passed ([`Error::Kill`] if killing failed).
    /// - [`Error::Failed`] on a non-zero exit, with the captured output.
    /// - [`Error::Output`] if the output does not start with a number, or the
    ///   number does not fit in bytes.
    pub async fn measure(&self, dir: impl AsRef<Path>, timeout: Duration) -> Result<u64> {
        let dir = dir.as_ref();
        if dir.as_os_str().is_empty() {
            return Err(Error::EmptyDirectory);
        }
        let command = self.describe(dir);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| Error::Pipe {
            command: command.clone(),
            stream: "stdout",
        })?;
        let stderr = child.stderr.take().ok_or_else(|| Error::Pipe {
            command: command.clone(),
            stream: "stderr",
        })?;

        let run = async { tokio::try_join!(read_all(stdout), read_all(stderr), child.wait()) };
        let outcome = tokio::time::timeout(timeout, run).await;

        let (stdout, stderr, status) = match outcome {
            Ok(result) => result.map_err(|source| Error::Wait {
                command: command.clone(),
                source,
            })?,
            Err(_) => {
                log::info!("killing `{command}` due to timeout ({timeout:?})");
                child.kill().await.map_err(|source| Error::Kill {
                    command: command.clone(),
                    source,
                })?;
                return Err(Error::Timeout {
                    command,
                    dir: dir.to_path_buf(),
                    timeout,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&stdout).into_owned();
        if !status.success() {
            return Err(Error::Failed {
                command,
                dir: dir.to_path_buf(),
                status,
                stdout,
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
            });
        }

        parse_usage_bytes(&command, &stdout)
    }

    fn describe(&self, dir: &Path) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .chain(std::iter::once(dir.as_os_str()))
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

async fn read_all(mut stream: impl AsyncRead + Unpin) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    Ok(buf)
}

/// Reads the leading kilobyte count and converts it to bytes.
fn parse_usage_bytes(command: &str, stdout: &str) -> Result<u64> {
    let output_error = |source| Error::Output {
        command: command.to_owned(),
        output: stdout.to_owned(),
        source,
    };
    let field = stdout
        .split_whitespace()
        .next()
        .ok_or_else(|| output_error(None))?;
    let kilobytes: u64 = field.parse().map_err(|e| output_error(Some(e)))?;
    kilobytes.checked_mul(1024).ok_or_else(|| output_error(None))
}
