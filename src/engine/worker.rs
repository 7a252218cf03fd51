// Cache worker lifecycle facade — wires stores, sync engine, router and
// bulk fetcher for one application version.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::offline::BulkFetcher;
use super::stats::{StatsCollector, StatsSnapshot};
use super::sync::SyncEngine;
use crate::config::WorkerConfig;
use crate::error::EngineError;
use crate::manifest::ResourceManifest;
use crate::router::{RequestRouter, RouteOutcome};
use crate::source::ResourceSource;
use crate::store::CacheBackend;

/// Commands accepted on the worker's message channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerMessage {
    /// Request immediate activation of a waiting version. The host queries
    /// `skip_waiting_requested` and drives its own lifecycle.
    SkipWaiting,
    /// Download every manifest resource not yet cached.
    DownloadOffline,
}

/// One application version's cache worker.
///
/// The host environment serializes the lifecycle: `install` runs to
/// completion before `activate`, and at most one version transition is in
/// flight at a time. `handle_request` calls are independent and may run
/// concurrently with each other and with an offline download.
pub struct CacheWorker {
    manifest: ResourceManifest,
    core_set: Vec<String>,
    sync: SyncEngine,
    router: RequestRouter,
    offline: BulkFetcher,
    stats: Arc<StatsCollector>,
    skip_waiting: AtomicBool,
    shutdown_token: CancellationToken,
}

impl CacheWorker {
    pub fn new(
        config: WorkerConfig,
        manifest: ResourceManifest,
        core_set: Vec<String>,
        backend: Arc<dyn CacheBackend>,
        source: Arc<dyn ResourceSource>,
    ) -> Self {
        let stats = Arc::new(StatsCollector::new());
        let shutdown_token = CancellationToken::new();

        let sync = SyncEngine::new(
            Arc::clone(&backend),
            Arc::clone(&source),
            config.clone(),
            Arc::clone(&stats),
        );
        let router = RequestRouter::new(
            manifest.clone(),
            Arc::clone(&backend),
            Arc::clone(&source),
            config.clone(),
            Arc::clone(&stats),
        );
        let offline = BulkFetcher::new(
            backend,
            source,
            manifest.clone(),
            config,
            Arc::clone(&stats),
            shutdown_token.clone(),
        );

        Self {
            manifest,
            core_set,
            sync,
            router,
            offline,
            stats,
            skip_waiting: AtomicBool::new(false),
            shutdown_token,
        }
    }

    /// Install phase: stage the shell resource set. On failure the previous
    /// version's caches are untouched and activation must not proceed.
    pub async fn install(&self) -> Result<(), EngineError> {
        info!(
            "install: staging shell ({} resources, manifest has {})",
            self.core_set.len(),
            self.manifest.len()
        );
        self.sync.stage(&self.core_set).await
    }

    /// Activate phase: reconcile the content cache against this version's
    /// manifest.
    pub async fn activate(&self) -> Result<(), EngineError> {
        self.sync.reconcile(&self.manifest).await
    }

    /// Route one incoming read request.
    pub async fn handle_request(
        &self,
        method: &str,
        raw_key: &str,
    ) -> Result<RouteOutcome, EngineError> {
        self.router.handle(method, raw_key).await
    }

    /// Handle a command from the host's message channel.
    pub async fn handle_message(&self, message: WorkerMessage) -> Result<(), EngineError> {
        match message {
            WorkerMessage::SkipWaiting => {
                debug!("skip-waiting requested");
                self.skip_waiting.store(true, Ordering::Relaxed);
                Ok(())
            }
            WorkerMessage::DownloadOffline => {
                let downloaded = self.offline.download_all().await?;
                info!("offline download complete, {} resources fetched", downloaded);
                Ok(())
            }
        }
    }

    /// Whether a skip-waiting command has been received.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::Relaxed)
    }

    /// The manifest this worker was built for.
    pub fn manifest(&self) -> &ResourceManifest {
        &self.manifest
    }

    /// Current statistics snapshot.
    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Cancel in-flight bulk download scheduling.
    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }
}

impl Drop for CacheWorker {
    fn drop(&mut self) {
        debug!("cache worker dropped, cancelling background downloads");
        self.shutdown_token.cancel();
    }
}
