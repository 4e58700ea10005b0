// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Descriptor loading with a three-way outcome.
//!
//! A producer uploads `meta.json` last, so on any pass some blocks are
//! expected to be mid-upload. Loading therefore distinguishes:
//!
//! | Situation | Outcome |
//! |-----------|---------|
//! | descriptor missing | [`MetaLoad::Pending`] |
//! | descriptor not a JSON object | [`MetaLoad::Pending`] |
//! | version absent or != 1 | `Err(UnsupportedMetaVersion)` |
//! | version 1, other fields malformed | [`MetaLoad::Pending`] |
//! | read/transport failure | `Err(Store)` |
//! | version 1, well formed | [`MetaLoad::Loaded`] |
//!
//! The version is read before anything else, so a descriptor from a newer
//! producer fails the run even when the rest of its schema is unfamiliar.

use crate::block::{BlockId, BlockMeta, META_VERSION_1};
use crate::error::{ReplicationError, Result};
use crate::store::{read_all, ObjectStore};
use serde_json::{Map, Value};

/// Result of a successful load attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaLoad {
    /// A usable descriptor.
    Loaded(BlockMeta),
    /// Not written yet (or only partially). Try again next run.
    Pending { reason: PendingReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingReason {
    Missing,
    Unparseable,
}

impl std::fmt::Display for PendingReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "meta file missing"),
            Self::Unparseable => write!(f, "meta file unparseable"),
        }
    }
}

/// Fetch and parse `{id}/meta.json` from `store`.
pub async fn load_meta(store: &dyn ObjectStore, id: BlockId) -> Result<MetaLoad> {
    let key = id.meta_path();

    let reader = match store.get(&key).await {
        Ok(r) => r,
        Err(e) if store.is_obj_not_found(&e) => {
            return Ok(MetaLoad::Pending {
                reason: PendingReason::Missing,
            })
        }
        Err(e) => return Err(ReplicationError::store("get meta file", key, e)),
    };

    let body = read_all(&key, reader)
        .await
        .map_err(|e| ReplicationError::store("read meta file", key.as_str(), e))?;

    let unparseable = Ok(MetaLoad::Pending {
        reason: PendingReason::Unparseable,
    });

    let Some(version) = descriptor_version(&body) else {
        return unparseable;
    };

    if version != i64::from(META_VERSION_1) {
        return Err(ReplicationError::UnsupportedMetaVersion {
            block: id.to_string(),
            version,
        });
    }

    match serde_json::from_slice::<BlockMeta>(&body) {
        Ok(meta) => Ok(MetaLoad::Loaded(meta)),
        Err(_) => unparseable,
    }
}

/// The `version` of a JSON object descriptor, 0 when absent or null.
///
/// `None` when the body is not a JSON object or the version is not an
/// integer.
fn descriptor_version(body: &[u8]) -> Option<i64> {
    let object: Map<String, Value> = serde_json::from_slice(body).ok()?;
    match object.get("version") {
        None | Some(Value::Null) => Some(0),
        Some(v) => v.as_i64(),
    }
}
