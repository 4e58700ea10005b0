// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Object store integration traits.
//!
//! Defines the narrow interface the replication engine needs from a bucket.
//! Concrete cloud clients (S3, GCS, ...) live outside this crate and plug in
//! by implementing [`ObjectStore`].
//!
//! # Example
//!
//! ```rust,no_run
//! use block_replicate::store::{BoxFuture, ObjectReader, ObjectStore, StoreError};
//!
//! struct MyBucket { /* ... */ }
//!
//! impl ObjectStore for MyBucket {
//!     fn name(&self) -> &str {
//!         "my-bucket"
//!     }
//!
//!     fn iter(&self, _dir: &str) -> BoxFuture<'_, Vec<String>> {
//!         Box::pin(async move { Ok(vec![]) })
//!     }
//!
//!     fn get(&self, key: &str) -> BoxFuture<'_, ObjectReader> {
//!         let key = key.to_string();
//!         Box::pin(async move { Err(StoreError::NotFound { key }) })
//!     }
//!
//!     fn upload(&self, _key: &str, _reader: ObjectReader) -> BoxFuture<'_, ()> {
//!         Box::pin(async move { Ok(()) })
//!     }
//!
//!     fn exists(&self, _key: &str) -> BoxFuture<'_, bool> {
//!         Box::pin(async move { Ok(false) })
//!     }
//! }
//! ```

mod fs;
mod memory;

pub use fs::FilesystemStore;
pub use memory::InMemoryStore;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Type alias for boxed async futures (keeps the trait dyn-compatible).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// A readable object body. Dropping it closes the underlying stream.
pub type ObjectReader = Box<dyn AsyncRead + Send + Unpin>;

/// Shared handle to a store, as held by the engine.
pub type SharedStore = Arc<dyn ObjectStore>;

/// Errors reported by store implementations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The object does not exist.
    #[error("object not found: {key}")]
    NotFound { key: String },

    /// Local or transport I/O failure.
    #[error("I/O error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Any other backend failure (credentials, protocol, invalid key...).
    #[error("backend error on {key}: {message}")]
    Backend { key: String, message: String },
}

impl StoreError {
    /// Map an I/O error on `key`, keeping "not found" distinguishable.
    pub fn from_io(key: impl Into<String>, source: std::io::Error) -> Self {
        let key = key.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { key }
        } else {
            Self::Io { key, source }
        }
    }
}

/// What the replication engine needs from a bucket.
///
/// The origin store is only ever read from. The target store is
/// existence-checked, read (descriptor only) and written to.
pub trait ObjectStore: Send + Sync + 'static {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// List entries directly under `dir` (non-recursive).
    ///
    /// Entries are full keys. Sub-directories are returned with a trailing
    /// `/`. A directory that does not exist lists as empty.
    fn iter(&self, dir: &str) -> BoxFuture<'_, Vec<String>>;

    /// Open an object for reading.
    fn get(&self, key: &str) -> BoxFuture<'_, ObjectReader>;

    /// Write the full stream as the object's new content (overwrite).
    fn upload(&self, key: &str, reader: ObjectReader) -> BoxFuture<'_, ()>;

    /// Check if an object exists.
    fn exists(&self, key: &str) -> BoxFuture<'_, bool>;

    /// Classify an error as "object absent" versus any other failure.
    ///
    /// Implementations whose backend reports absence differently can
    /// override this. Default: [`StoreError::NotFound`].
    fn is_obj_not_found(&self, err: &StoreError) -> bool {
        matches!(err, StoreError::NotFound { .. })
    }
}

/// Drain a reader into memory. Only used for small objects (descriptors).
pub async fn read_all(key: &str, mut reader: ObjectReader) -> StoreResult<Vec<u8>> {
    let mut buf = Vec::new();
    reader
        .read_to_end(&mut buf)
        .await
        .map_err(|e| StoreError::from_io(key, e))?;
    Ok(buf)
}

/// Wrap owned bytes as an [`ObjectReader`].
pub fn bytes_reader(data: Vec<u8>) -> ObjectReader {
    Box::new(std::io::Cursor::new(data))
}
