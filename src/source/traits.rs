use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;

/// A successfully fetched resource.
#[derive(Debug)]
pub struct FetchedResource {
    pub body: Bytes,
    pub content_type: String,
}

/// Where resources come from.
///
/// `revalidate` asks the source to bypass any intermediary caches so the
/// bytes reflect the currently deployed version; shell staging always sets
/// it. A non-success response is a `FetchError`, not a resource.
#[async_trait]
pub trait ResourceSource: Send + Sync {
    async fn fetch(&self, key: &str, revalidate: bool) -> Result<FetchedResource, FetchError>;
}
