//! Error types for the cache engine.

use std::path::PathBuf;

use thiserror::Error;

/// A resource fetch that did not produce a usable response.
///
/// Both transport failures and non-success HTTP statuses are fetch failures;
/// the router's online-first fallback treats them the same way.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be completed (network unreachable, DNS, TLS...).
    #[error("request for {key} failed: {message}")]
    Network {
        /// Resource key being fetched.
        key: String,
        /// Description of the transport failure.
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("request for {key} returned HTTP {status}")]
    Status {
        /// Resource key being fetched.
        key: String,
        /// HTTP status code.
        status: u16,
    },
}

impl FetchError {
    /// Resource key the failed fetch was for.
    pub fn key(&self) -> &str {
        match self {
            FetchError::Network { key, .. } => key,
            FetchError::Status { key, .. } => key,
        }
    }
}

/// Errors from a cache storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error while reading or writing backing storage.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A stored record exists but could not be decoded.
    #[error("cache record {key} could not be decoded: {reason}")]
    Decode {
        /// Key of the corrupt record.
        key: String,
        /// Description of the decode failure.
        reason: String,
    },

    /// A value could not be serialized for storage.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

/// Top-level error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A resource fetch failed and no fallback applied.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A shell resource could not be staged during install. Activation must
    /// not proceed; the previous version's cache is untouched.
    #[error("failed to stage shell resource {key}")]
    Stage {
        /// The shell resource that could not be fetched.
        key: String,
        /// The underlying fetch failure.
        #[source]
        source: FetchError,
    },

    /// Reconciliation failed. All cache containers have been torn down and
    /// the next load performs a full cold rebuild.
    #[error("reconciliation failed, caches were reset: {reason}")]
    Reconcile {
        /// Description of the failure that triggered the teardown.
        reason: String,
    },

    /// A storage backend failure outside reconciliation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_display() {
        let err = FetchError::Status {
            key: "main.dart.js".to_string(),
            status: 503,
        };
        let msg = err.to_string();
        assert!(msg.contains("main.dart.js"));
        assert!(msg.contains("503"));
        assert_eq!(err.key(), "main.dart.js");
    }

    #[test]
    fn stage_error_carries_source() {
        let err = EngineError::Stage {
            key: "index.html".to_string(),
            source: FetchError::Network {
                key: "index.html".to_string(),
                message: "connection refused".to_string(),
            },
        };
        assert!(err.to_string().contains("index.html"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn store_io_display() {
        let err = StoreError::Io {
            path: PathBuf::from("/tmp/cache/app-content"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("app-content"));
    }
}
