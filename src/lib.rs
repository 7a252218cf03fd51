// Manifest-driven incremental cache synchronization engine.
//
// A version of an application is described by a resource manifest (resource
// key -> content fingerprint). On install, a small core "shell" set is staged
// into a temporary cache with forced revalidation; on activate, the durable
// content cache is reconciled against the manifest (unchanged entries are
// retained, stale ones evicted, the staged shell merged in) and the manifest
// is persisted for the next upgrade. Live read requests are then served
// cache-first, with an online-first policy for the entry point.

pub mod config;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod router;
pub mod source;
pub mod store;

pub use config::WorkerConfig;
pub use engine::worker::{CacheWorker, WorkerMessage};
pub use error::{EngineError, FetchError, StoreError};
pub use manifest::ResourceManifest;
pub use router::{RouteDecision, RouteOutcome};
