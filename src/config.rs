use serde::Deserialize;

/// Maximum number of concurrent resource fetches during stage / bulk download.
pub const DEFAULT_FETCH_CONCURRENCY: u32 = 6;

/// Number of retries per resource fetch before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Query-string marker recognized as a cache-busting suffix and stripped
/// during key normalization.
pub const VERSION_QUERY_MARKER: &str = "?v=";

/// Canonical key for the application entry point.
pub const DEFAULT_ROOT_KEY: &str = "/";

/// Top-level configuration for the cache worker.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Name of the durable content cache container.
    pub content_cache: String,
    /// Name of the transient staging cache container populated during install.
    pub staging_cache: String,
    /// Name of the container holding the persisted manifest record.
    pub manifest_cache: String,
    /// Canonical resource key of the application entry point.
    pub root_key: String,
    /// Maximum number of concurrent fetch tasks.
    pub fetch_concurrency: u32,
    /// Retries per resource fetch before the operation fails.
    pub max_retries: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            content_cache: "app-content".to_string(),
            staging_cache: "app-staging".to_string(),
            manifest_cache: "app-manifest".to_string(),
            root_key: DEFAULT_ROOT_KEY.to_string(),
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}
