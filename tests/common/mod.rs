#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use shellcache::error::FetchError;
use shellcache::source::{FetchedResource, ResourceSource};
use shellcache::store::{CacheBackend, MemoryBackend};
use shellcache::WorkerConfig;

/// In-memory resource source with failure injection and fetch counting.
pub struct StubSource {
    resources: Mutex<HashMap<String, (Bytes, String)>>,
    offline: AtomicBool,
    failing: Mutex<HashSet<String>>,
    fetch_counts: Mutex<HashMap<String, u32>>,
}

impl StubSource {
    pub fn new() -> Self {
        Self {
            resources: Mutex::new(HashMap::new()),
            offline: AtomicBool::new(false),
            failing: Mutex::new(HashSet::new()),
            fetch_counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, key: &str, body: &[u8]) {
        self.insert_with_type(key, body, "application/octet-stream");
    }

    pub fn insert_with_type(&self, key: &str, body: &[u8], content_type: &str) {
        self.resources.lock().insert(
            key.to_string(),
            (Bytes::copy_from_slice(body), content_type.to_string()),
        );
    }

    /// Simulate an unreachable network for every key.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    /// Make a single key answer with a server error.
    pub fn set_failing(&self, key: &str, failing: bool) {
        if failing {
            self.failing.lock().insert(key.to_string());
        } else {
            self.failing.lock().remove(key);
        }
    }

    /// Number of fetch attempts seen for a key.
    pub fn fetch_count(&self, key: &str) -> u32 {
        self.fetch_counts.lock().get(key).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ResourceSource for StubSource {
    async fn fetch(&self, key: &str, _revalidate: bool) -> Result<FetchedResource, FetchError> {
        *self
            .fetch_counts
            .lock()
            .entry(key.to_string())
            .or_insert(0) += 1;

        if self.offline.load(Ordering::Relaxed) {
            return Err(FetchError::Network {
                key: key.to_string(),
                message: "network unreachable".to_string(),
            });
        }
        if self.failing.lock().contains(key) {
            return Err(FetchError::Status {
                key: key.to_string(),
                status: 500,
            });
        }
        match self.resources.lock().get(key) {
            Some((body, content_type)) => Ok(FetchedResource {
                body: body.clone(),
                content_type: content_type.clone(),
            }),
            None => Err(FetchError::Status {
                key: key.to_string(),
                status: 404,
            }),
        }
    }
}

/// Worker config without fetch retries, so failure tests don't sleep.
pub fn test_config() -> WorkerConfig {
    WorkerConfig {
        max_retries: 0,
        ..WorkerConfig::default()
    }
}

/// Sorted keys of a container, read through the backend.
pub async fn cached_keys(backend: &Arc<MemoryBackend>, container: &str) -> Vec<String> {
    let mut keys = backend
        .open(container)
        .await
        .unwrap()
        .keys()
        .await
        .unwrap();
    keys.sort();
    keys
}

/// Body bytes of a cached entry, if present.
pub async fn cached_body(
    backend: &Arc<MemoryBackend>,
    container: &str,
    key: &str,
) -> Option<Vec<u8>> {
    backend
        .open(container)
        .await
        .unwrap()
        .get(key)
        .await
        .unwrap()
        .map(|r| r.body.to_vec())
}
