//! In-memory stores for tests and local development.

use async_trait::async_trait;
use rust_common::PlatformError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::{ObjectStore, ParameterStore};

/// Parameter store backed by a map.
#[derive(Debug, Default)]
pub struct MemoryParameterStore {
    values: RwLock<HashMap<String, String>>,
    unavailable: AtomicBool,
    reads: AtomicUsize,
}

impl MemoryParameterStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace a parameter value.
    pub async fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.values.write().await.insert(name.into(), value.into());
    }

    /// Remove a parameter.
    pub async fn remove(&self, name: &str) {
        self.values.write().await.remove(name);
    }

    /// Make every read fail with [`PlatformError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of reads served or failed so far.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ParameterStore for MemoryParameterStore {
    async fn get_parameter(&self, name: &str) -> Result<String, PlatformError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PlatformError::unavailable("parameter store offline"));
        }
        self.values
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| PlatformError::not_found(name))
    }
}

/// Object store backed by a map of `(bucket, key)` pairs.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<(String, String), Vec<u8>>>,
    reads: RwLock<HashMap<(String, String), usize>>,
}

impl MemoryObjectStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object.
    pub async fn put(&self, bucket: impl Into<String>, key: impl Into<String>, body: Vec<u8>) {
        self.objects
            .write()
            .await
            .insert((bucket.into(), key.into()), body);
    }

    /// Delete an object.
    pub async fn remove(&self, bucket: &str, key: &str) {
        self.objects
            .write()
            .await
            .remove(&(bucket.to_string(), key.to_string()));
    }

    /// Number of reads of one object, including failed ones.
    pub async fn reads(&self, bucket: &str, key: &str) -> usize {
        self.reads
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, PlatformError> {
        let id = (bucket.to_string(), key.to_string());
        *self.reads.write().await.entry(id.clone()).or_default() += 1;
        self.objects
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found(format!("{bucket}/{key}")))
    }
}
