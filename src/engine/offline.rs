// Bulk resource download — populate the cache for explicit offline use.

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::fetch::fetch_into;
use super::stats::StatsCollector;
use crate::config::WorkerConfig;
use crate::error::EngineError;
use crate::manifest::ResourceManifest;
use crate::source::ResourceSource;
use crate::store::CacheBackend;

/// Downloads every manifest resource not yet present in the content cache.
///
/// Independent of the install/activate lifecycle and safe to invoke at any
/// time after first activation. Idempotent: resources stored by an earlier
/// (possibly failed) run are not fetched again.
pub struct BulkFetcher {
    backend: Arc<dyn CacheBackend>,
    source: Arc<dyn ResourceSource>,
    manifest: ResourceManifest,
    config: WorkerConfig,
    stats: Arc<StatsCollector>,
    cancel: CancellationToken,
}

impl BulkFetcher {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        source: Arc<dyn ResourceSource>,
        manifest: ResourceManifest,
        config: WorkerConfig,
        stats: Arc<StatsCollector>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            backend,
            source,
            manifest,
            config,
            stats,
            cancel,
        }
    }

    /// Fetch and store every manifest key missing from the content cache.
    /// Returns the number of resources downloaded.
    pub async fn download_all(&self) -> Result<usize, EngineError> {
        let content = self.backend.open(&self.config.content_cache).await?;
        let cached: HashSet<String> = content.keys().await?.into_iter().collect();

        let mut missing: Vec<String> = self
            .manifest
            .keys()
            .filter(|k| !cached.contains(*k))
            .map(str::to_string)
            .collect();
        missing.sort();

        if missing.is_empty() {
            debug!("offline download requested, cache already complete");
            return Ok(0);
        }

        info!("downloading {} resources for offline use", missing.len());
        let stored = fetch_into(
            &self.source,
            &content,
            missing,
            false,
            self.config.fetch_concurrency,
            self.config.max_retries,
            &self.stats,
            &self.cancel,
        )
        .await?;

        Ok(stored)
    }
}
