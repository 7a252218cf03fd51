// In-memory cache backend over locked hash maps.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::traits::{CacheBackend, CacheContainer, CachedResource};
use crate::error::StoreError;

/// In-process cache backend. Containers share the backend's lifetime; a
/// deleted container disappears from the backend, but clones of its `Arc`
/// held by in-flight operations remain readable until dropped.
#[derive(Default)]
pub struct MemoryBackend {
    containers: RwLock<HashMap<String, Arc<MemoryContainer>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheContainer>, StoreError> {
        {
            let containers = self.containers.read();
            if let Some(c) = containers.get(name) {
                return Ok(Arc::clone(c) as Arc<dyn CacheContainer>);
            }
        }

        let mut containers = self.containers.write();
        let container = containers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryContainer::default()));
        Ok(Arc::clone(container) as Arc<dyn CacheContainer>)
    }

    async fn delete_container(&self, name: &str) -> Result<(), StoreError> {
        self.containers.write().remove(name);
        Ok(())
    }
}

#[derive(Default)]
struct MemoryContainer {
    entries: RwLock<HashMap<String, CachedResource>>,
}

#[async_trait]
impl CacheContainer for MemoryContainer {
    async fn get(&self, key: &str) -> Result<Option<CachedResource>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(&self, key: &str, resource: CachedResource) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_string(), resource);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.write().remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[tokio::test]
    async fn put_get_delete_roundtrip() {
        let backend = MemoryBackend::new();
        let cache = backend.open("content").await.unwrap();

        assert!(cache.get("index.html").await.unwrap().is_none());

        let res = CachedResource::new(Bytes::from_static(b"<html>"), "text/html");
        cache.put("index.html", res.clone()).await.unwrap();
        assert_eq!(cache.get("index.html").await.unwrap(), Some(res));

        assert!(cache.delete("index.html").await.unwrap());
        assert!(!cache.delete("index.html").await.unwrap());
        assert!(cache.get("index.html").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn open_returns_same_container() {
        let backend = MemoryBackend::new();
        let a = backend.open("content").await.unwrap();
        a.put(
            "k",
            CachedResource::new(Bytes::from_static(b"v"), "text/plain"),
        )
        .await
        .unwrap();

        let b = backend.open("content").await.unwrap();
        assert!(b.get("k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_container_drops_entries() {
        let backend = MemoryBackend::new();
        let cache = backend.open("content").await.unwrap();
        cache
            .put(
                "k",
                CachedResource::new(Bytes::from_static(b"v"), "text/plain"),
            )
            .await
            .unwrap();

        backend.delete_container("content").await.unwrap();
        let fresh = backend.open("content").await.unwrap();
        assert!(fresh.get("k").await.unwrap().is_none());
        assert!(fresh.keys().await.unwrap().is_empty());
    }
}
