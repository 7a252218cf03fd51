// Cache synchronization — shell staging and manifest reconciliation.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::fetch::fetch_into;
use super::stats::StatsCollector;
use crate::config::WorkerConfig;
use crate::error::EngineError;
use crate::manifest::{ManifestStore, ResourceManifest};
use crate::source::ResourceSource;
use crate::store::CacheBackend;

/// Aligns the durable content cache with a new resource manifest.
///
/// `stage` runs during install and must complete before activation;
/// `reconcile` runs during activate. At most one reconcile is in flight per
/// version transition, enforced by the host's lifecycle sequencing.
pub struct SyncEngine {
    backend: Arc<dyn CacheBackend>,
    source: Arc<dyn ResourceSource>,
    manifest_store: ManifestStore,
    config: WorkerConfig,
    stats: Arc<StatsCollector>,
}

impl SyncEngine {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        source: Arc<dyn ResourceSource>,
        config: WorkerConfig,
        stats: Arc<StatsCollector>,
    ) -> Self {
        let manifest_store = ManifestStore::new(Arc::clone(&backend), &config.manifest_cache);
        Self {
            backend,
            source,
            manifest_store,
            config,
            stats,
        }
    }

    /// Fetch every shell resource with forced revalidation into the staging
    /// cache. Fails if any shell resource cannot be fetched; the caller must
    /// not proceed to activation with an incomplete shell.
    pub async fn stage(&self, core_set: &[String]) -> Result<(), EngineError> {
        // Discard anything a previously failed install may have left staged.
        self.backend
            .delete_container(&self.config.staging_cache)
            .await?;
        let staging = self.backend.open(&self.config.staging_cache).await?;

        info!("staging {} shell resources", core_set.len());
        fetch_into(
            &self.source,
            &staging,
            core_set.to_vec(),
            true,
            self.config.fetch_concurrency,
            self.config.max_retries,
            &self.stats,
            &CancellationToken::new(),
        )
        .await
        .map_err(|e| EngineError::Stage {
            key: e.key().to_string(),
            source: e,
        })?;

        Ok(())
    }

    /// Reconcile the content cache against `new_manifest`: retain entries
    /// whose fingerprint is unchanged, evict the rest, merge the staged
    /// shell in, persist the manifest, and discard the staging cache.
    ///
    /// Any failure is treated as cache corruption: all three containers are
    /// deleted so the next load performs a full cold rebuild.
    pub async fn reconcile(&self, new_manifest: &ResourceManifest) -> Result<(), EngineError> {
        match self.try_reconcile(new_manifest).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("reconciliation failed, resetting caches: {}", e);
                let _ = self
                    .backend
                    .delete_container(&self.config.content_cache)
                    .await;
                let _ = self
                    .backend
                    .delete_container(&self.config.staging_cache)
                    .await;
                let _ = self.manifest_store.clear().await;
                Err(EngineError::Reconcile {
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn try_reconcile(&self, new_manifest: &ResourceManifest) -> Result<(), crate::error::StoreError> {
        let prior = self.manifest_store.load().await?;
        let staging = self.backend.open(&self.config.staging_cache).await?;

        let content = match prior {
            None => {
                // First install: discard any cache a previous, incompatible
                // version may have left behind.
                info!("no prior manifest, rebuilding content cache from scratch");
                self.backend
                    .delete_container(&self.config.content_cache)
                    .await?;
                self.backend.open(&self.config.content_cache).await?
            }
            Some(old_manifest) => {
                let content = self.backend.open(&self.config.content_cache).await?;
                let mut evicted = 0usize;
                for key in content.keys().await? {
                    // Retain only entries that are in the new manifest with
                    // an unchanged fingerprint; everything else is stale.
                    let unchanged = new_manifest.fingerprint(&key).is_some()
                        && new_manifest.fingerprint(&key) == old_manifest.fingerprint(&key);
                    if !unchanged {
                        content.delete(&key).await?;
                        evicted += 1;
                    }
                }
                debug!("evicted {} stale cache entries", evicted);
                content
            }
        };

        // Merge the staged shell, overwriting any retained entry with the
        // same key. Shell resources always win.
        let mut merged = 0usize;
        for key in staging.keys().await? {
            if let Some(resource) = staging.get(&key).await? {
                content.put(&key, resource).await?;
                merged += 1;
            }
        }

        self.manifest_store.save(new_manifest).await?;
        self.backend
            .delete_container(&self.config.staging_cache)
            .await?;

        info!(
            "reconciled content cache: {} shell resources merged, manifest has {} entries",
            merged,
            new_manifest.len()
        );
        Ok(())
    }
}
