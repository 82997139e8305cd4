//! Filesystem labels published by udev under `/dev/disk/by-label`.

use std::path::Path;

use crate::device;

use super::{Error, Result};

/// Default location of udev's label symlinks.
pub const DEFAULT_LABEL_DIR: &str = "/dev/disk/by-label";

/// Label of the device mounted at `/`.
pub const ROOT_LABEL: &str = "root";

/// Label of the device holding the container runtime's storage root.
pub const RUNTIME_IMAGES_LABEL: &str = "runtime-images";

/// Reads `(label, device path)` pairs from a udev by-label directory.
///
/// Each entry is a symlink such as `data -> ../../sdb1`; the link target's file
/// name is resolved under `/dev`. A missing directory yields no labels. Entries
/// that are not readable symlinks are logged and skipped.
///
/// # Errors
///
/// Returns [`Error::LabelDir`] if the directory exists but cannot be listed.
pub fn read_label_dir(dir: impl AsRef<Path>) -> Result<Vec<(String, String)>> {
    let dir = dir.as_ref();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("label directory `{}` does not exist", dir.display());
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(Error::LabelDir {
                path: dir.to_path_buf(),
                source,
            });
        }
    };

    let mut labels = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| Error::LabelDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let target = match std::fs::read_link(&path) {
            Ok(target) => target,
            Err(err) => {
                log::warn!("skipping label `{}`: {}", path.display(), err);
                continue;
            }
        };
        let Some(name) = target.file_name().and_then(|name| name.to_str()) else {
            log::warn!(
                "skipping label `{}`: unusable link target `{}`",
                path.display(),
                target.display()
            );
            continue;
        };

        let label = unescape_udev(&entry.file_name().to_string_lossy());
        labels.push((label, device::device_path(name)));
    }

    Ok(labels)
}

/// Decodes udev's `\xNN` escapes (e.g. `my\x20disk` -> `my disk`).
pub fn unescape_udev(raw: &str) -> String {
    let mut out = Vec::with_capacity(raw.len());
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && bytes.get(i + 1) == Some(&b'x') {
            if let Some(value) = raw
                .get(i + 2..i + 4)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            {
                out.push(value);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs as unix_fs;

    #[test]
    fn test_unescape_udev() {
        assert_eq!(unescape_udev(r"my\x20disk"), "my disk");
        assert_eq!(unescape_udev("plain"), "plain");
        assert_eq!(unescape_udev(r"bad\xZZ"), r"bad\xZZ");
        assert_eq!(unescape_udev(r"end\x2"), r"end\x2");
    }

    #[test]
    fn test_read_label_dir() {
        let tempdir = tempfile::tempdir().unwrap();
        unix_fs::symlink("../../sdb1", tempdir.path().join("data")).unwrap();
        unix_fs::symlink("../../dm-0", tempdir.path().join(r"my\x20vol")).unwrap();

        let mut labels = read_label_dir(tempdir.path()).unwrap();
        labels.sort();
        assert_eq!(
            labels,
            vec![
                ("data".to_owned(), "/dev/sdb1".to_owned()),
                ("my vol".to_owned(), "/dev/dm-0".to_owned()),
            ]
        );
    }

    #[test]
    fn test_read_label_dir_skips_non_links() {
        let tempdir = tempfile::tempdir().unwrap();
        std::fs::write(tempdir.path().join("not-a-link"), "x").unwrap();
        unix_fs::symlink("../../sda1", tempdir.path().join("boot")).unwrap();

        let labels = read_label_dir(tempdir.path()).unwrap();
        assert_eq!(labels, vec![("boot".to_owned(), "/dev/sda1".to_owned())]);
    }

    #[test]
    fn test_missing_label_dir() {
        let labels = read_label_dir("/definitely/does/not/exist").unwrap();
        assert!(labels.is_empty());
    }
}
