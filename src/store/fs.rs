// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Local filesystem bucket.
//!
//! Maps keys to files under a root directory. Uploads stream into a hidden
//! temporary file next to the destination and are renamed into place, so a
//! concurrent reader sees either the previous object or the complete new
//! one, never a prefix.

use super::{BoxFuture, ObjectReader, ObjectStore, StoreError, StoreResult};
use rand::Rng;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Temporary upload files start with this and are hidden from listings.
const TMP_PREFIX: &str = ".tmp-";

/// A bucket rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    name: String,
    root: PathBuf,
}

impl FilesystemStore {
    /// Open (creating if needed) a bucket rooted at `root`.
    pub async fn new(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| StoreError::from_io(root.display().to_string(), e))?;
        Ok(Self {
            name: format!("fs:{}", root.display()),
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path below the root, rejecting escapes.
    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        let rel = Path::new(key.trim_end_matches('/'));
        let valid = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !valid {
            return Err(StoreError::Backend {
                key: key.to_string(),
                message: "key must be a relative path without '..'".to_string(),
            });
        }
        Ok(self.root.join(rel))
    }
}

impl ObjectStore for FilesystemStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn iter(&self, dir: &str) -> BoxFuture<'_, Vec<String>> {
        let dir = dir.trim_end_matches('/').to_string();
        Box::pin(async move {
            let path = if dir.is_empty() {
                self.root.clone()
            } else {
                self.path_for(&dir)?
            };

            let mut read_dir = match tokio::fs::read_dir(&path).await {
                Ok(rd) => rd,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(StoreError::from_io(dir, e)),
            };

            let mut entries = Vec::new();
            while let Some(entry) = read_dir
                .next_entry()
                .await
                .map_err(|e| StoreError::from_io(dir.clone(), e))?
            {
                let file_name = entry.file_name().to_string_lossy().into_owned();
                if file_name.starts_with(TMP_PREFIX) {
                    continue;
                }
                let key = if dir.is_empty() {
                    file_name
                } else {
                    format!("{}/{}", dir, file_name)
                };
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| StoreError::from_io(key.clone(), e))?;
                if file_type.is_dir() {
                    entries.push(format!("{}/", key));
                } else {
                    entries.push(key);
                }
            }
            entries.sort();
            Ok(entries)
        })
    }

    fn get(&self, key: &str) -> BoxFuture<'_, ObjectReader> {
        let key = key.to_string();
        Box::pin(async move {
            let path = self.path_for(&key)?;
            let file = tokio::fs::File::open(&path)
                .await
                .map_err(|e| StoreError::from_io(key.clone(), e))?;
            Ok(Box::new(file) as ObjectReader)
        })
    }

    fn upload(&self, key: &str, mut reader: ObjectReader) -> BoxFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            let path = self.path_for(&key)?;
            let (parent, file_name) = match (path.parent(), path.file_name()) {
                (Some(parent), Some(file_name)) => (parent.to_path_buf(), file_name.to_owned()),
                _ => {
                    return Err(StoreError::Backend {
                        key,
                        message: "key does not name a file".to_string(),
                    })
                }
            };

            tokio::fs::create_dir_all(&parent)
                .await
                .map_err(|e| StoreError::from_io(key.clone(), e))?;

            let tmp = parent.join(format!(
                "{}{}-{:016x}",
                TMP_PREFIX,
                file_name.to_string_lossy(),
                rand::thread_rng().gen::<u64>()
            ));

            let written = async {
                let mut file = tokio::fs::File::create(&tmp).await?;
                let bytes = tokio::io::copy(&mut reader, &mut file).await?;
                file.flush().await?;
                file.sync_all().await?;
                tokio::fs::rename(&tmp, &path).await?;
                Ok::<u64, std::io::Error>(bytes)
            }
            .await;

            match written {
                Ok(bytes) => {
                    debug!(key = %key, bytes, "Wrote object");
                    Ok(())
                }
                Err(e) => {
                    if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                        if cleanup.kind() != std::io::ErrorKind::NotFound {
                            warn!(path = %tmp.display(), error = %cleanup, "Failed to remove temporary upload");
                        }
                    }
                    Err(StoreError::Io { key, source: e })
                }
            }
        })
    }

    fn exists(&self, key: &str) -> BoxFuture<'_, bool> {
        let key = key.to_string();
        Box::pin(async move {
            let path = self.path_for(&key)?;
            match tokio::fs::metadata(&path).await {
                Ok(meta) => Ok(meta.is_file()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(StoreError::from_io(key, e)),
            }
        })
    }
}
