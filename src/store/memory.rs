// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-memory bucket for tests and embedding.

use super::{bytes_reader, read_all, BoxFuture, ObjectReader, ObjectStore, StoreError};
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

/// A bucket held entirely in memory.
///
/// Keys are `/`-separated; "directories" exist implicitly as key prefixes.
pub struct InMemoryStore {
    name: String,
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Store an object directly, bypassing the stream API.
    pub async fn insert(&self, key: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.objects.write().await.insert(key.into(), data.into());
    }

    /// Snapshot of every object.
    pub async fn objects(&self) -> BTreeMap<String, Vec<u8>> {
        self.objects.read().await.clone()
    }

    /// Content of one object, if present.
    pub async fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).cloned()
    }

    /// Number of objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Check if empty.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

impl ObjectStore for InMemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn iter(&self, dir: &str) -> BoxFuture<'_, Vec<String>> {
        let prefix = match dir.trim_end_matches('/') {
            "" => String::new(),
            d => format!("{}/", d),
        };
        Box::pin(async move {
            let objects = self.objects.read().await;
            let mut entries = BTreeSet::new();
            for key in objects.keys().filter(|k| k.starts_with(&prefix)) {
                let rest = &key[prefix.len()..];
                match rest.find('/') {
                    Some(idx) => entries.insert(format!("{}{}/", prefix, &rest[..idx])),
                    None => entries.insert(key.clone()),
                };
            }
            Ok(entries.into_iter().collect())
        })
    }

    fn get(&self, key: &str) -> BoxFuture<'_, ObjectReader> {
        let key = key.to_string();
        Box::pin(async move {
            match self.objects.read().await.get(&key) {
                Some(data) => Ok(bytes_reader(data.clone())),
                None => Err(StoreError::NotFound { key }),
            }
        })
    }

    fn upload(&self, key: &str, reader: ObjectReader) -> BoxFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            let data = read_all(&key, reader).await?;
            self.objects.write().await.insert(key, data);
            Ok(())
        })
    }

    fn exists(&self, key: &str) -> BoxFuture<'_, bool> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.objects.read().await.contains_key(&key)) })
    }
}
