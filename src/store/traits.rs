use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;

/// A resource as stored in a cache container.
///
/// The content fingerprint is not stored alongside the payload; the external
/// manifest is the source of truth for freshness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResource {
    /// Response payload.
    pub body: Bytes,
    /// MIME type reported by the source.
    pub content_type: String,
}

impl CachedResource {
    pub fn new(body: Bytes, content_type: impl Into<String>) -> Self {
        Self {
            body,
            content_type: content_type.into(),
        }
    }
}

/// A single named key/value container within a cache backend.
#[async_trait]
pub trait CacheContainer: Send + Sync {
    /// Look up a resource by key. Returns `None` on a miss.
    async fn get(&self, key: &str) -> Result<Option<CachedResource>, StoreError>;

    /// Store a resource under a key, replacing any previous entry.
    async fn put(&self, key: &str, resource: CachedResource) -> Result<(), StoreError>;

    /// Remove the entry for a key. Returns `true` if an entry was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// List all keys currently present in the container.
    async fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// A collection of named cache containers.
///
/// The minimal contract any persistent or in-memory store must satisfy:
/// open-by-name and delete-by-name. Opening a name that does not exist yet
/// creates an empty container.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Open (creating if necessary) the container with the given name.
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheContainer>, StoreError>;

    /// Delete the container with the given name and all its entries.
    /// Deleting a container that does not exist is not an error.
    async fn delete_container(&self, name: &str) -> Result<(), StoreError>;
}
