// On-disk cache backend — one directory per container, one file per entry.
//
// Each entry is written as a 4-byte little-endian header length, a JSON
// header carrying the resource key and content type, then the raw payload.
// The filename is the SHA-256 digest of the key, so arbitrary resource paths
// never reach the filesystem namespace.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use super::traits::{CacheBackend, CacheContainer, CachedResource};
use crate::error::StoreError;

/// File extension for cache entries.
const ENTRY_EXT: &str = "entry";

/// JSON header prepended to every entry file.
#[derive(Debug, Serialize, Deserialize)]
struct EntryHeader {
    key: String,
    content_type: String,
}

/// Filesystem-backed cache backend rooted at a directory.
///
/// Entry reads are fail-safe: a truncated or corrupt entry is treated as a
/// cache miss, never an error.
pub struct DiskBackend {
    root: PathBuf,
}

impl DiskBackend {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn container_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[async_trait]
impl CacheBackend for DiskBackend {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheContainer>, StoreError> {
        let dir = self.container_dir(name);
        fs::create_dir_all(&dir).map_err(|e| StoreError::Io {
            path: dir.clone(),
            source: e,
        })?;
        Ok(Arc::new(DiskContainer { dir }))
    }

    async fn delete_container(&self, name: &str) -> Result<(), StoreError> {
        let dir = self.container_dir(name);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io {
                path: dir,
                source: e,
            }),
        }
    }
}

struct DiskContainer {
    dir: PathBuf,
}

impl DiskContainer {
    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.{}", hex::encode(digest), ENTRY_EXT))
    }

    /// Decode an entry file into its header and payload.
    /// Returns `None` if the file is truncated or the header is invalid.
    fn decode_entry(raw: &[u8]) -> Option<(EntryHeader, Bytes)> {
        if raw.len() < 4 {
            return None;
        }
        let header_len = u32::from_le_bytes(raw[..4].try_into().ok()?) as usize;
        if raw.len() < 4 + header_len {
            return None;
        }
        let header: EntryHeader = serde_json::from_slice(&raw[4..4 + header_len]).ok()?;
        let payload = Bytes::copy_from_slice(&raw[4 + header_len..]);
        Some((header, payload))
    }
}

#[async_trait]
impl CacheContainer for DiskContainer {
    async fn get(&self, key: &str) -> Result<Option<CachedResource>, StoreError> {
        let path = self.entry_path(key);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Io {
                    path,
                    source: e,
                })
            }
        };

        match Self::decode_entry(&raw) {
            Some((header, payload)) => Ok(Some(CachedResource::new(payload, header.content_type))),
            None => {
                warn!("corrupt cache entry for {} treated as miss", key);
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &str, resource: CachedResource) -> Result<(), StoreError> {
        let header = EntryHeader {
            key: key.to_string(),
            content_type: resource.content_type.clone(),
        };
        let header_bytes =
            serde_json::to_vec(&header).map_err(|e| StoreError::Serialization {
                reason: e.to_string(),
            })?;

        let header_len = header_bytes.len() as u32;
        let mut output = Vec::with_capacity(4 + header_bytes.len() + resource.body.len());
        output.extend_from_slice(&header_len.to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(&resource.body);

        let path = self.entry_path(key);
        fs::write(&path, &output).map_err(|e| StoreError::Io {
            path,
            source: e,
        })
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Io {
                path,
                source: e,
            }),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Io {
                    path: self.dir.clone(),
                    source: e,
                })
            }
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::Io {
                path: self.dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXT) {
                continue;
            }
            // Unreadable entries are skipped rather than failing the listing.
            let Ok(raw) = fs::read(&path) else {
                continue;
            };
            if let Some((header, _)) = Self::decode_entry(&raw) {
                keys.push(header.key);
            }
        }
        Ok(keys)
    }
}
