// Request routing — classifies intercepted reads and serves them per policy.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{VERSION_QUERY_MARKER, WorkerConfig};
use crate::engine::stats::StatsCollector;
use crate::error::EngineError;
use crate::manifest::ResourceManifest;
use crate::source::ResourceSource;
use crate::store::{CacheBackend, CachedResource};

/// How a request should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Not a managed resource; the host's default handling takes over.
    PassThrough,
    /// The entry point: network first, cache fallback.
    OnlineFirst,
    /// Any other manifest resource: cache first, lazy network fill.
    CacheFirst,
}

/// Result of routing one request.
#[derive(Debug)]
pub enum RouteOutcome {
    /// The request was not intercepted.
    PassThrough,
    /// The request was served with this resource.
    Served(CachedResource),
}

/// Normalize a raw request path into a manifest key.
///
/// Strips a leading slash, drops a recognized `?v=` cache-busting suffix,
/// and maps the empty path or fragment-only navigation to the root key.
fn normalize_key(raw: &str, root_key: &str) -> String {
    let mut key = raw.strip_prefix('/').unwrap_or(raw);
    if let Some(idx) = key.find(VERSION_QUERY_MARKER) {
        key = &key[..idx];
    }
    if key.is_empty() || key.starts_with('#') {
        root_key.to_string()
    } else {
        key.to_string()
    }
}

/// Serves intercepted read requests from the content cache per policy.
pub struct RequestRouter {
    manifest: ResourceManifest,
    backend: Arc<dyn CacheBackend>,
    source: Arc<dyn ResourceSource>,
    content_cache: String,
    root_key: String,
    stats: Arc<StatsCollector>,
}

impl RequestRouter {
    pub fn new(
        manifest: ResourceManifest,
        backend: Arc<dyn CacheBackend>,
        source: Arc<dyn ResourceSource>,
        config: WorkerConfig,
        stats: Arc<StatsCollector>,
    ) -> Self {
        Self {
            manifest,
            backend,
            source,
            content_cache: config.content_cache,
            root_key: config.root_key,
            stats,
        }
    }

    /// Classify a normalized key.
    pub fn classify(&self, key: &str) -> RouteDecision {
        if !self.manifest.contains(key) {
            RouteDecision::PassThrough
        } else if key == self.root_key {
            RouteDecision::OnlineFirst
        } else {
            RouteDecision::CacheFirst
        }
    }

    /// Route one request. Only read-only requests are intercepted; anything
    /// other than GET passes through to the host's default handling.
    pub async fn handle(
        &self,
        method: &str,
        raw_key: &str,
    ) -> Result<RouteOutcome, EngineError> {
        if !method.eq_ignore_ascii_case("GET") {
            return Ok(RouteOutcome::PassThrough);
        }

        let key = normalize_key(raw_key, &self.root_key);
        match self.classify(&key) {
            RouteDecision::PassThrough => {
                debug!("pass through {}", key);
                Ok(RouteOutcome::PassThrough)
            }
            RouteDecision::OnlineFirst => {
                self.online_first(&key).await.map(RouteOutcome::Served)
            }
            RouteDecision::CacheFirst => {
                self.cache_first(&key).await.map(RouteOutcome::Served)
            }
        }
    }

    /// Serve from cache; on a miss fetch from the network and store a copy.
    /// A failed fetch propagates untouched: the shell negotiation already
    /// guaranteed presence of anything the application needs at startup.
    async fn cache_first(&self, key: &str) -> Result<CachedResource, EngineError> {
        let cache = self.backend.open(&self.content_cache).await?;

        if let Some(resource) = cache.get(key).await? {
            debug!("cache hit {}", key);
            self.stats.record_request(true);
            self.stats.record_served(resource.body.len() as u64);
            return Ok(resource);
        }

        debug!("cache miss {}, fetching", key);
        self.stats.record_request(false);
        let fetched = self.source.fetch(key, false).await?;
        self.stats.record_fetched(fetched.body.len() as u64);

        let resource = CachedResource::new(fetched.body, fetched.content_type);
        cache.put(key, resource.clone()).await?;
        self.stats.record_served(resource.body.len() as u64);
        Ok(resource)
    }

    /// Entry-point policy: always try the network first so the entry point
    /// self-heals across deployments; fall back to the cached copy only when
    /// the fetch fails, and propagate the original error when both miss.
    async fn online_first(&self, key: &str) -> Result<CachedResource, EngineError> {
        let cache = self.backend.open(&self.content_cache).await?;

        match self.source.fetch(key, false).await {
            Ok(fetched) => {
                self.stats.record_request(false);
                self.stats.record_fetched(fetched.body.len() as u64);

                let resource = CachedResource::new(fetched.body, fetched.content_type);
                cache.put(key, resource.clone()).await?;
                self.stats.record_served(resource.body.len() as u64);
                Ok(resource)
            }
            Err(err) => {
                warn!("entry point fetch failed, trying cache: {}", err);
                match cache.get(key).await? {
                    Some(resource) => {
                        self.stats.record_request(true);
                        self.stats.record_fallback();
                        self.stats.record_served(resource.body.len() as u64);
                        Ok(resource)
                    }
                    None => Err(EngineError::Fetch(err)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_leading_slash() {
        assert_eq!(normalize_key("/index.html", "/"), "index.html");
        assert_eq!(normalize_key("index.html", "/"), "index.html");
    }

    #[test]
    fn test_normalize_strips_version_suffix() {
        assert_eq!(normalize_key("/main.dart.js?v=8f9bee", "/"), "main.dart.js");
        assert_eq!(normalize_key("main.dart.js?v=", "/"), "main.dart.js");
    }

    #[test]
    fn test_normalize_maps_root_forms() {
        assert_eq!(normalize_key("", "/"), "/");
        assert_eq!(normalize_key("/", "/"), "/");
        assert_eq!(normalize_key("/#/settings", "/"), "/");
        assert_eq!(normalize_key("/?v=123", "/"), "/");
    }

    #[test]
    fn test_normalize_keeps_nested_paths() {
        assert_eq!(
            normalize_key("/assets/fonts/Regular.ttf", "/"),
            "assets/fonts/Regular.ttf"
        );
    }
}
