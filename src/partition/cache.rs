use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use crate::device::DeviceInfo;

use super::source::{Discovery, MountSource};
use super::{Error, Partition, Result};

/// Immutable view of the tracked partitions, replaced wholesale on refresh.
#[derive(Debug, Default)]
pub struct Snapshot {
    partitions: BTreeMap<String, Partition>,
    by_major_minor: HashMap<(u32, u32), String>,
    labels: BTreeMap<String, String>,
}

impl Snapshot {
    /// Builds a snapshot, enforcing one partition per device and one device
    /// per major:minor pair (first seen wins). For labels the last one wins.
    fn build(discovery: Discovery) -> Self {
        let mut snapshot = Self::default();

        for (device, partition) in discovery.partitions {
            if snapshot.partitions.contains_key(&device) {
                log::debug!("ignoring duplicate partition entry for `{device}`");
                continue;
            }
            let key = (partition.major, partition.minor);
            match snapshot.by_major_minor.get(&key) {
                Some(owner) => log::warn!(
                    "major:minor {}:{} of `{device}` already belongs to `{owner}`",
                    key.0,
                    key.1
                ),
                None => {
                    snapshot.by_major_minor.insert(key, device.clone());
                }
            }
            snapshot.partitions.insert(device, partition);
        }

        for (label, device) in discovery.labels {
            if let Some(previous) = snapshot.labels.insert(label.clone(), device.clone()) {
                if previous != device {
                    log::warn!("label `{label}` moved from `{previous}` to `{device}`");
                }
            }
        }

        snapshot
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

/// Cache of tracked partitions with label and major:minor indices.
///
/// Readers work against an `Arc`'d [`Snapshot`]; [`refresh`](Self::refresh)
/// builds a complete new snapshot before swapping it in, so a reader never
/// observes a mix of old and new entries.
pub struct PartitionCache {
    source: Box<dyn MountSource>,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl std::fmt::Debug for PartitionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionCache")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl PartitionCache {
    /// Creates an empty cache; call [`refresh`](Self::refresh) to populate it.
    pub fn new(source: impl MountSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
        }
    }

    /// Re-discovers the partition set and publishes it.
    ///
    /// # Errors
    ///
    /// Returns the discovery error; the previous snapshot stays in place.
    pub fn refresh(&self) -> Result<()> {
        let snapshot = Arc::new(Snapshot::build(self.source.discover()?));
        log::debug!("partition cache refreshed with {} entries", snapshot.len());
        self.publish(snapshot);
        Ok(())
    }

    /// Drops all cached state. Lookups fail until the next successful refresh.
    pub fn clear(&self) {
        self.publish(Arc::new(Snapshot::default()));
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        let guard = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    fn publish(&self, snapshot: Arc<Snapshot>) {
        let mut guard = self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = snapshot;
    }

    /// Looks up the partition of `device`.
    ///
    /// # Errors
    ///
    /// [`Error::DeviceNotFound`] if the device is not tracked.
    pub fn partition_for_device(&self, device: &str) -> Result<Partition> {
        self.snapshot()
            .partitions
            .get(device)
            .cloned()
            .ok_or_else(|| Error::DeviceNotFound {
                device: device.to_owned(),
            })
    }

    /// Looks up the device identified by a major:minor pair.
    ///
    /// # Errors
    ///
    /// [`Error::MajorMinorNotFound`] if no tracked partition declares the pair.
    pub fn device_info_for_major_minor(&self, major: u32, minor: u32) -> Result<DeviceInfo> {
        self.snapshot()
            .by_major_minor
            .get(&(major, minor))
            .map(|device| DeviceInfo::new(device.clone(), major, minor))
            .ok_or(Error::MajorMinorNotFound { major, minor })
    }

    /// Calls `f` for every `(device, partition)` of the current snapshot, in
    /// device order, stopping at the first error.
    pub fn apply_over_partitions<E>(
        &self,
        mut f: impl FnMut(&str, &Partition) -> std::result::Result<(), E>,
    ) -> std::result::Result<(), E> {
        let snapshot = self.snapshot();
        for (device, partition) in &snapshot.partitions {
            f(device, partition)?;
        }
        Ok(())
    }

    /// Resolves a filesystem label to its device path.
    ///
    /// # Errors
    ///
    /// [`Error::LabelNotFound`] if the label is unknown.
    pub fn device_name_for_label(&self, label: &str) -> Result<String> {
        self.snapshot()
            .labels
            .get(label)
            .cloned()
            .ok_or_else(|| Error::LabelNotFound {
                label: label.to_owned(),
            })
    }

    /// Calls `f` for every `(label, device)` of the current snapshot, in label
    /// order, stopping at the first error.
    pub fn apply_over_labels<E>(
        &self,
        mut f: impl FnMut(&str, &str) -> std::result::Result<(), E>,
    ) -> std::result::Result<(), E> {
        let snapshot = self.snapshot();
        for (label, device) in &snapshot.labels {
            f(label, device)?;
        }
        Ok(())
    }
}
