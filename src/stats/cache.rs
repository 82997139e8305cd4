use dashmap::DashMap;

use crate::partition::Partition;

use super::strategy::{StatKind, Strategies};
use super::{FsUsage, Result};

/// Per-device filesystem statistics, dispatched by [`StatKind`] and cached
/// until [`clear`](Self::clear) for strategies that allow it.
#[derive(Default)]
pub struct FsStatsCache {
    strategies: Strategies,
    entries: DashMap<String, FsUsage>,
}

impl std::fmt::Debug for FsStatsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsStatsCache")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl FsStatsCache {
    pub fn new(strategies: Strategies) -> Self {
        Self {
            strategies,
            entries: DashMap::new(),
        }
    }

    /// Returns statistics for the filesystem of `device`.
    ///
    /// # Errors
    ///
    /// Propagates the strategy's error; nothing is cached in that case.
    pub fn fs_stats(&self, device: &str, partition: &Partition) -> Result<FsUsage> {
        if let Some(usage) = self.entries.get(device) {
            return Ok(*usage);
        }

        let strategy = self.strategies.get(StatKind::for_partition(partition));
        let usage = strategy.stat(device, partition)?;
        if strategy.cacheable() {
            self.entries.insert(device.to_owned(), usage);
        }
        Ok(usage)
    }

    /// Drops every cached value.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
