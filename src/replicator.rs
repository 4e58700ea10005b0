// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Object and block copy, idempotent across runs.
//!
//! # Object level
//!
//! An object that already exists in the target is never re-read: chunk and
//! index objects are immutable for a given block id, so presence implies
//! completeness. Missing objects are stream-copied.
//!
//! # Block level
//!
//! ```text
//! origin meta == target meta ?  ──yes──▶ already replicated, done
//!          │ no (or target missing / truncated)
//!          ▼
//! ensure each chunks/* object ──▶ ensure index ──▶ upload meta.json
//! ```
//!
//! The descriptor is written last. A descriptor in the target is therefore
//! proof that every other object of the block is present.

use crate::block::BlockId;
use crate::error::{ReplicationError, Result};
use crate::metrics;
use crate::scheme::RunStats;
use crate::store::{bytes_reader, read_all, ObjectStore, StoreError};
use std::future::Future;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

/// What happened to one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    /// Target descriptor matched byte-for-byte; nothing was touched.
    AlreadyReplicated,
    /// Missing objects were copied and the descriptor uploaded.
    Replicated,
}

/// Race a store call against the shutdown signal.
///
/// A dropped shutdown sender counts as shutdown.
pub(crate) async fn cancellable<T, F>(shutdown: &watch::Receiver<bool>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if *shutdown.borrow() {
        return Err(ReplicationError::Shutdown);
    }
    let mut rx = shutdown.clone();
    tokio::select! {
        biased;
        _ = rx.wait_for(|stop| *stop) => Err(ReplicationError::Shutdown),
        result = fut => result,
    }
}

/// Copies blocks from `from` to `to` for the duration of one run.
pub struct Replicator<'a> {
    from: &'a dyn ObjectStore,
    to: &'a dyn ObjectStore,
    shutdown: &'a watch::Receiver<bool>,
}

impl<'a> Replicator<'a> {
    pub fn new(
        from: &'a dyn ObjectStore,
        to: &'a dyn ObjectStore,
        shutdown: &'a watch::Receiver<bool>,
    ) -> Self {
        Self { from, to, shutdown }
    }

    /// Make sure the whole block is present in the target.
    #[instrument(skip_all, fields(block = %id))]
    pub async fn ensure_block_is_replicated(
        &self,
        id: BlockId,
        stats: &mut RunStats,
    ) -> Result<BlockOutcome> {
        let meta_key = id.meta_path();
        debug!("Ensuring block is replicated");

        let origin_meta = cancellable(self.shutdown, async {
            let reader = self
                .from
                .get(&meta_key)
                .await
                .map_err(|e| ReplicationError::store("get meta file from origin bucket", &meta_key, e))?;
            read_all(&meta_key, reader)
                .await
                .map_err(|e| ReplicationError::store("read meta file from origin bucket", &meta_key, e))
        })
        .await?;

        let target_meta = cancellable(self.shutdown, self.read_target_meta(&meta_key)).await?;

        if target_meta.as_deref() == Some(origin_meta.as_slice()) {
            debug!("Skipping block as already replicated");
            stats.already_replicated += 1;
            metrics::record_block_already_replicated();
            return Ok(BlockOutcome::AlreadyReplicated);
        }

        let chunks_dir = id.chunks_dir();
        let chunks = cancellable(self.shutdown, async {
            self.from
                .iter(&chunks_dir)
                .await
                .map_err(|e| ReplicationError::store("list chunks in origin bucket", &chunks_dir, e))
        })
        .await?;

        for object in chunks.iter().filter(|name| !name.ends_with('/')) {
            self.ensure_object_replicated(object, stats).await?;
        }

        self.ensure_object_replicated(&id.index_path(), stats).await?;

        // Descriptor last: its presence marks the block complete.
        debug!(object = %meta_key, "Replicating meta file");
        cancellable(self.shutdown, async {
            self.to
                .upload(&meta_key, bytes_reader(origin_meta))
                .await
                .map_err(|e| ReplicationError::store("upload meta file to target bucket", &meta_key, e))
        })
        .await?;

        stats.blocks_replicated += 1;
        metrics::record_block_replicated();
        info!("Block replicated");
        Ok(BlockOutcome::Replicated)
    }

    /// Copy one object unless the target already has it.
    ///
    /// Returns `true` when a copy happened.
    #[instrument(skip_all, fields(object = %key))]
    pub async fn ensure_object_replicated(&self, key: &str, stats: &mut RunStats) -> Result<bool> {
        let present = cancellable(self.shutdown, async {
            self.to
                .exists(key)
                .await
                .map_err(|e| ReplicationError::store("check object in target bucket", key, e))
        })
        .await?;

        if present {
            debug!("Skipping object as already replicated");
            return Ok(false);
        }

        debug!("Object not present in target bucket, replicating");
        cancellable(self.shutdown, async {
            let reader = self
                .from
                .get(key)
                .await
                .map_err(|e| ReplicationError::store("get object from origin bucket", key, e))?;
            self.to
                .upload(key, reader)
                .await
                .map_err(|e| ReplicationError::store("upload object to target bucket", key, e))
        })
        .await?;

        stats.objects_replicated += 1;
        metrics::record_object_replicated();
        info!("Object replicated");
        Ok(true)
    }

    /// Target descriptor bytes, `None` when absent.
    async fn read_target_meta(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let reader = match self.to.get(key).await {
            Ok(r) => r,
            Err(e) if self.to.is_obj_not_found(&e) => return Ok(None),
            Err(e) => return Err(ReplicationError::store("get meta file from target bucket", key, e)),
        };
        match read_all(key, reader).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e @ StoreError::NotFound { .. }) => {
                debug!(error = %e, "Target meta file vanished while reading");
                Ok(None)
            }
            Err(e) => Err(ReplicationError::store("read meta file from target bucket", key, e)),
        }
    }
}
