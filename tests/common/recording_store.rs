//! Recording ObjectStore for testing.
//!
//! Wraps an [`InMemoryStore`] and records every call in order, so tests can
//! assert on upload order and count. Failures and stalls can be injected
//! per operation to exercise error and cancellation paths.

use block_replicate::store::{BoxFuture, InMemoryStore, ObjectReader, ObjectStore, StoreError};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// A recorded store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Iter(String),
    Get(String),
    Upload(String),
    Exists(String),
}

/// Mock store that records all calls.
///
/// # Example
/// ```rust,ignore
/// let store = RecordingStore::new("target");
/// store.fail_uploads_matching("/index");
///
/// // Use in tests...
///
/// assert_eq!(store.uploads().len(), 2);
/// ```
pub struct RecordingStore {
    inner: InMemoryStore,
    calls: Mutex<Vec<Call>>,
    /// Uploads whose key contains this fail with a backend error
    fail_upload_pattern: Mutex<Option<String>>,
    /// Gets whose key contains this fail with a backend error
    fail_get_pattern: Mutex<Option<String>>,
    /// Listing fails while set
    fail_iter: AtomicBool,
    /// Gets never complete while set
    stall_gets: AtomicBool,
    /// Number of injected failures returned
    injected: AtomicUsize,
}

impl RecordingStore {
    pub fn new(name: &str) -> Self {
        Self {
            inner: InMemoryStore::new(name),
            calls: Mutex::new(Vec::new()),
            fail_upload_pattern: Mutex::new(None),
            fail_get_pattern: Mutex::new(None),
            fail_iter: AtomicBool::new(false),
            stall_gets: AtomicBool::new(false),
            injected: AtomicUsize::new(0),
        }
    }

    /// Seed an object without recording a call.
    pub async fn insert(&self, key: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.inner.insert(key, data).await;
    }

    pub async fn objects(&self) -> BTreeMap<String, Vec<u8>> {
        self.inner.objects().await
    }

    pub async fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.object(key).await
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Keys uploaded, in call order (including failed attempts).
    pub fn uploads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Upload(k) => Some(k),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn fail_uploads_matching(&self, pattern: &str) {
        *self.fail_upload_pattern.lock().unwrap() = Some(pattern.to_string());
    }

    pub fn fail_gets_matching(&self, pattern: &str) {
        *self.fail_get_pattern.lock().unwrap() = Some(pattern.to_string());
    }

    pub fn set_fail_iter(&self, fail: bool) {
        self.fail_iter.store(fail, Ordering::SeqCst);
    }

    pub fn set_stall_gets(&self, stall: bool) {
        self.stall_gets.store(stall, Ordering::SeqCst);
    }

    /// Remove all injected failures and stalls.
    pub fn heal(&self) {
        *self.fail_upload_pattern.lock().unwrap() = None;
        *self.fail_get_pattern.lock().unwrap() = None;
        self.set_fail_iter(false);
        self.set_stall_gets(false);
    }

    pub fn injected_failures(&self) -> usize {
        self.injected.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn injected_error(&self, key: &str) -> StoreError {
        self.injected.fetch_add(1, Ordering::SeqCst);
        StoreError::Backend {
            key: key.to_string(),
            message: "injected failure".to_string(),
        }
    }

    fn matches(pattern: &Mutex<Option<String>>, key: &str) -> bool {
        pattern
            .lock()
            .unwrap()
            .as_deref()
            .is_some_and(|p| key.contains(p))
    }
}

impl ObjectStore for RecordingStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn iter(&self, dir: &str) -> BoxFuture<'_, Vec<String>> {
        self.record(Call::Iter(dir.to_string()));
        if self.fail_iter.load(Ordering::SeqCst) {
            let err = self.injected_error(dir);
            return Box::pin(async move { Err(err) });
        }
        self.inner.iter(dir)
    }

    fn get(&self, key: &str) -> BoxFuture<'_, ObjectReader> {
        self.record(Call::Get(key.to_string()));
        if self.stall_gets.load(Ordering::SeqCst) {
            return Box::pin(std::future::pending());
        }
        if Self::matches(&self.fail_get_pattern, key) {
            let err = self.injected_error(key);
            return Box::pin(async move { Err(err) });
        }
        self.inner.get(key)
    }

    fn upload(&self, key: &str, reader: ObjectReader) -> BoxFuture<'_, ()> {
        self.record(Call::Upload(key.to_string()));
        if Self::matches(&self.fail_upload_pattern, key) {
            let err = self.injected_error(key);
            return Box::pin(async move { Err(err) });
        }
        self.inner.upload(key, reader)
    }

    fn exists(&self, key: &str) -> BoxFuture<'_, bool> {
        self.record(Call::Exists(key.to_string()));
        self.inner.exists(key)
    }
}
