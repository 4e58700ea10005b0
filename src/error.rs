// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for block replication.
//!
//! Errors are categorized by what failed (a store call, a descriptor, the
//! configuration) and carry the object key or block id they concern, so a
//! failed run can be logged with an actionable message.
//!
//! # Error Categories
//!
//! | Error Type | Retryable | Description |
//! |------------|-----------|-------------|
//! | `Store` | Yes | Read/write/list failure against either store |
//! | `MetaLoad` | Inner | Descriptor could not be loaded for a block |
//! | `BlockReplication` | Inner | Copying a block failed |
//! | `UnsupportedMetaVersion` | No | Descriptor schema version is unknown |
//! | `Config` | No | Configuration invalid |
//! | `InvalidState` | No | Engine lifecycle violation |
//! | `Shutdown` | No | The run was cancelled by shutdown |
//!
//! # Retry Behavior
//!
//! The engine never retries inside a run. Retrying is temporal: the next
//! scheduled run starts over, and the idempotency checks make that cheap.
//! [`ReplicationError::is_retryable()`] tells whether waiting for the next
//! run can plausibly fix the failure.

use crate::store::StoreError;
use thiserror::Error;

/// Result type alias for replication operations.
pub type Result<T> = std::result::Result<T, ReplicationError>;

/// Errors that can occur during replication.
#[derive(Error, Debug)]
pub enum ReplicationError {
    /// A store operation failed.
    ///
    /// `operation` names the step (e.g. "get meta file from origin bucket").
    #[error("{operation} ({key}): {source}")]
    Store {
        operation: String,
        key: String,
        #[source]
        source: StoreError,
    },

    /// Loading the descriptor of a discovered block failed fatally.
    #[error("load meta for block {block} from origin bucket: {source}")]
    MetaLoad {
        block: String,
        #[source]
        source: Box<ReplicationError>,
    },

    /// Replicating a candidate block failed; the run stops here.
    #[error("ensure block {block} is replicated: {source}")]
    BlockReplication {
        block: String,
        #[source]
        source: Box<ReplicationError>,
    },

    /// The descriptor declares a schema version we do not know. A missing
    /// version reads as 0.
    ///
    /// Not retryable - a newer producer wrote it, retrying cannot help.
    #[error("unexpected meta file version {version} for block {block}")]
    UnsupportedMetaVersion { block: String, version: i64 },

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Engine state machine violation.
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// Shutdown in progress.
    #[error("Shutdown in progress")]
    Shutdown,
}

impl ReplicationError {
    /// Wrap a store error with the step and key it happened on.
    pub fn store(
        operation: impl Into<String>,
        key: impl Into<String>,
        source: StoreError,
    ) -> Self {
        Self::Store {
            operation: operation.into(),
            key: key.into(),
            source,
        }
    }

    /// Check if waiting for the next run may fix this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store { .. } => true,
            Self::MetaLoad { source, .. } => source.is_retryable(),
            Self::BlockReplication { source, .. } => source.is_retryable(),
            Self::UnsupportedMetaVersion { .. } => false,
            Self::Config(_) => false,
            Self::InvalidState { .. } => false,
            Self::Shutdown => false,
        }
    }

    /// Check if this error (possibly wrapped) is a shutdown cancellation.
    pub fn is_shutdown(&self) -> bool {
        match self {
            Self::Shutdown => true,
            Self::MetaLoad { source, .. } | Self::BlockReplication { source, .. } => {
                source.is_shutdown()
            }
            _ => false,
        }
    }
}
