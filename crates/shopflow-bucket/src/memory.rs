use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{BucketError, BucketStore};

/// In-process bucket used for local runs and tests. Individual keys can be
/// made to fail so callers can exercise partial-failure paths.
#[derive(Debug)]
pub struct MemoryBucketStore {
    bucket: String,
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    exists: bool,
    objects: BTreeMap<String, Bytes>,
    failing_gets: BTreeSet<String>,
    failing_puts: BTreeSet<String>,
    pending_probe_failures: usize,
    probe_calls: usize,
}

impl MemoryBucketStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            state: Mutex::new(MemoryState {
                exists: true,
                ..MemoryState::default()
            }),
        }
    }

    /// A store whose bucket has not been created yet.
    pub fn missing(bucket: impl Into<String>) -> Self {
        let store = Self::new(bucket);
        if let Ok(mut state) = store.state.lock() {
            state.exists = false;
        }
        store
    }

    pub fn insert(&self, key: impl Into<String>, bytes: impl Into<Bytes>) {
        if let Ok(mut state) = self.state.lock() {
            state.objects.insert(key.into(), bytes.into());
        }
    }

    pub fn fail_get(&self, key: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_gets.insert(key.into());
        }
    }

    pub fn fail_put(&self, key: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_puts.insert(key.into());
        }
    }

    /// The next `count` calls to `bucket_exists` report a connectivity error.
    pub fn fail_next_probes(&self, count: usize) {
        if let Ok(mut state) = self.state.lock() {
            state.pending_probe_failures = count;
        }
    }

    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.objects.get(key).cloned())
    }

    pub fn keys(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn probe_calls(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.probe_calls)
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, BucketError> {
        self.state
            .lock()
            .map_err(|_| BucketError::Sdk("memory bucket state poisoned".into()))
    }
}

#[async_trait]
impl BucketStore for MemoryBucketStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn bucket_exists(&self) -> Result<bool, BucketError> {
        let mut state = self.lock()?;
        state.probe_calls += 1;
        if state.pending_probe_failures > 0 {
            state.pending_probe_failures -= 1;
            return Err(BucketError::Sdk(format!(
                "connection to bucket {} timed out",
                self.bucket
            )));
        }
        Ok(state.exists)
    }

    async fn create_bucket(&self, _region: &str) -> Result<(), BucketError> {
        self.lock()?.exists = true;
        Ok(())
    }

    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        _content_type: &str,
    ) -> Result<(), BucketError> {
        let mut state = self.lock()?;
        if !state.exists {
            return Err(BucketError::NotFound(self.bucket.clone()));
        }
        if state.failing_puts.contains(key) {
            return Err(BucketError::Sdk(format!("upload of {key} was reset")));
        }
        state.objects.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, BucketError> {
        let state = self.lock()?;
        if state.failing_gets.contains(key) {
            return Err(BucketError::Sdk(format!("download of {key} was reset")));
        }
        state
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| BucketError::NotFound(key.to_string()))
    }

    async fn delete_object(&self, key: &str) -> Result<(), BucketError> {
        self.lock()?.objects.remove(key);
        Ok(())
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, BucketError> {
        let state = self.lock()?;
        Ok(state
            .objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}
