//! Resource manifest and its persisted record.
//!
//! A manifest maps every resource key of one deployed version to its content
//! fingerprint. The last successfully applied manifest is persisted as a JSON
//! record in a dedicated cache container so the next upgrade can retain
//! unchanged resources instead of re-downloading them.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::{CacheBackend, CachedResource};

/// Key under which the manifest record is stored in its container.
const MANIFEST_RECORD_KEY: &str = "manifest";

/// Content type of the persisted manifest record.
const MANIFEST_CONTENT_TYPE: &str = "application/json";

/// Mapping of resource key to content fingerprint for one deployable version.
///
/// Immutable once produced; a new manifest fully replaces the old one.
/// Serializes as a plain JSON object, the shape the build step emits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceManifest {
    entries: HashMap<String, String>,
}

impl ResourceManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint recorded for a key, if the key is part of this version.
    pub fn fingerprint(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ResourceManifest {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Persists the last-applied manifest in its own cache container.
pub struct ManifestStore {
    backend: Arc<dyn CacheBackend>,
    container_name: String,
}

impl ManifestStore {
    pub fn new(backend: Arc<dyn CacheBackend>, container_name: impl Into<String>) -> Self {
        Self {
            backend,
            container_name: container_name.into(),
        }
    }

    /// Load the persisted manifest.
    ///
    /// Returns `None` when no record exists (first install). A record that
    /// exists but cannot be decoded is an error: the caller treats it as
    /// cache corruption and tears everything down.
    pub async fn load(&self) -> Result<Option<ResourceManifest>, StoreError> {
        let container = self.backend.open(&self.container_name).await?;
        let Some(record) = container.get(MANIFEST_RECORD_KEY).await? else {
            return Ok(None);
        };

        let manifest =
            serde_json::from_slice(&record.body).map_err(|e| StoreError::Decode {
                key: MANIFEST_RECORD_KEY.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Some(manifest))
    }

    /// Overwrite the persisted manifest with `manifest`.
    pub async fn save(&self, manifest: &ResourceManifest) -> Result<(), StoreError> {
        let json = serde_json::to_vec(manifest).map_err(|e| StoreError::Serialization {
            reason: e.to_string(),
        })?;

        let container = self.backend.open(&self.container_name).await?;
        container
            .put(
                MANIFEST_RECORD_KEY,
                CachedResource::new(Bytes::from(json), MANIFEST_CONTENT_TYPE),
            )
            .await
    }

    /// Delete the manifest container entirely.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.backend.delete_container(&self.container_name).await
    }
}

#[cfg(test)]
mod tests {
    use crate::store::MemoryBackend;

    use super::*;

    fn sample() -> ResourceManifest {
        ResourceManifest::from_iter([
            ("index.html", "4ea18"),
            ("/", "4ea18"),
            ("main.dart.js", "8f9be"),
        ])
    }

    #[test]
    fn serializes_as_plain_object() {
        let manifest = ResourceManifest::from_iter([("index.html", "abc")]);
        let json = serde_json::to_string(&manifest).unwrap();
        assert_eq!(json, r#"{"index.html":"abc"}"#);

        let back: ResourceManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.fingerprint("index.html"), Some("abc"));
    }

    #[tokio::test]
    async fn load_missing_returns_none() {
        let backend = Arc::new(MemoryBackend::new());
        let store = ManifestStore::new(backend, "app-manifest");
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let backend = Arc::new(MemoryBackend::new());
        let store = ManifestStore::new(backend, "app-manifest");

        store.save(&sample()).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, sample());
    }

    #[tokio::test]
    async fn corrupt_record_is_an_error() {
        let backend = Arc::new(MemoryBackend::new());
        let container = backend.open("app-manifest").await.unwrap();
        container
            .put(
                MANIFEST_RECORD_KEY,
                CachedResource::new(
                    Bytes::from_static(b"not valid json {{{"),
                    MANIFEST_CONTENT_TYPE,
                ),
            )
            .await
            .unwrap();

        let store = ManifestStore::new(backend, "app-manifest");
        assert!(matches!(
            store.load().await,
            Err(StoreError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn clear_removes_record() {
        let backend = Arc::new(MemoryBackend::new());
        let store = ManifestStore::new(backend, "app-manifest");
        store.save(&sample()).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }
}
