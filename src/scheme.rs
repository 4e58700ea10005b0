// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! One replication run: discover, filter, order, copy.
//!
//! # Ordering
//!
//! Candidates are replicated strictly oldest `min_time` first, one at a
//! time. A compactor watching the target may start as soon as blocks
//! appear there; copying in time order keeps the visible set a contiguous
//! prefix of the origin's, so it never merges a newer block while an
//! older overlapping one is still missing.
//!
//! # Failure
//!
//! Blocks whose descriptor is not there yet are skipped. Anything else
//! aborts the run and is returned; the next scheduled run starts over.

use crate::block::{is_block_dir, BlockMeta};
use crate::error::{ReplicationError, Result};
use crate::filter::BlockFilter;
use crate::meta::{load_meta, MetaLoad};
use crate::metrics;
use crate::replicator::{cancellable, Replicator};
use crate::store::SharedStore;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

/// Counts from one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Entries visited at the origin bucket root.
    pub iterations: u64,
    /// Descriptor loads attempted.
    pub meta_loads: u64,
    /// Blocks skipped because their descriptor is not (fully) uploaded.
    pub partial_meta: u64,
    /// Blocks passing the filter.
    pub candidates: u64,
    /// Candidates whose target descriptor already matched.
    pub already_replicated: u64,
    /// Candidates copied during this run.
    pub blocks_replicated: u64,
    /// Individual objects uploaded to the target.
    pub objects_replicated: u64,
}

/// Replicates eligible blocks from one store to another.
pub struct ReplicationScheme {
    from: SharedStore,
    to: SharedStore,
    filter: BlockFilter,
}

impl ReplicationScheme {
    pub fn new(from: SharedStore, to: SharedStore, filter: BlockFilter) -> Self {
        Self { from, to, filter }
    }

    pub fn filter(&self) -> &BlockFilter {
        &self.filter
    }

    /// Run one pass.
    ///
    /// Every store call is raced against `shutdown`; once it flips to
    /// `true` (or its sender is dropped) the run returns
    /// [`ReplicationError::Shutdown`] at the next suspension point.
    #[instrument(skip_all, fields(from = %self.from.name(), to = %self.to.name()))]
    pub async fn execute(&self, shutdown: &watch::Receiver<bool>) -> Result<RunStats> {
        let mut stats = RunStats::default();

        debug!("Scanning origin bucket for blocks");
        let mut candidates = self.discover(shutdown, &mut stats).await?;

        // Stable sort keeps listing order for equal min_time
        candidates.sort_by_key(|meta| meta.min_time);
        stats.candidates = candidates.len() as u64;

        let replicator = Replicator::new(self.from.as_ref(), self.to.as_ref(), shutdown);
        for meta in &candidates {
            replicator
                .ensure_block_is_replicated(meta.ulid, &mut stats)
                .await
                .map_err(|e| ReplicationError::BlockReplication {
                    block: meta.ulid.to_string(),
                    source: Box::new(e),
                })?;
        }

        Ok(stats)
    }

    /// Load every block descriptor at the origin root and keep the eligible ones.
    async fn discover(
        &self,
        shutdown: &watch::Receiver<bool>,
        stats: &mut RunStats,
    ) -> Result<Vec<BlockMeta>> {
        let entries = cancellable(shutdown, async {
            self.from
                .iter("")
                .await
                .map_err(|e| ReplicationError::store("iterate over origin bucket", "", e))
        })
        .await?;

        let mut candidates = Vec::new();
        for entry in entries {
            stats.iterations += 1;
            metrics::record_origin_iteration();

            let Some(id) = is_block_dir(&entry) else {
                continue;
            };

            stats.meta_loads += 1;
            metrics::record_origin_meta_load();

            let loaded = cancellable(shutdown, load_meta(self.from.as_ref(), id))
                .await
                .map_err(|e| ReplicationError::MetaLoad {
                    block: id.to_string(),
                    source: Box::new(e),
                })?;

            let meta = match loaded {
                MetaLoad::Loaded(meta) => meta,
                MetaLoad::Pending { reason } => {
                    stats.partial_meta += 1;
                    metrics::record_origin_partial_meta();
                    info!(block = %id, %reason, "Block meta not uploaded yet, skipping");
                    continue;
                }
            };

            if meta.thanos.labels.is_empty() {
                info!(block = %id, "Block meta has no external labels, skipping");
                continue;
            }

            if self.filter.filter(&meta) {
                debug!(block = %id, min_time = meta.min_time, "Adding block to candidates");
                candidates.push(meta);
            }
        }

        Ok(candidates)
    }
}
