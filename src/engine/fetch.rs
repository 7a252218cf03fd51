// Bounded-concurrency fetch fan-out shared by shell staging and bulk download.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::stats::StatsCollector;
use crate::error::FetchError;
use crate::source::ResourceSource;
use crate::store::{CacheContainer, CachedResource};

/// Fetch every key and store the result in `container`.
///
/// Fetches run concurrently up to `concurrency` permits, each with
/// `max_retries` retries and linear backoff. Cancellation is cooperative:
/// a cancelled key reports a fetch failure rather than being silently
/// skipped. Returns the number of resources stored; the first failure is
/// reported after all in-flight tasks settle.
pub(crate) async fn fetch_into(
    source: &Arc<dyn ResourceSource>,
    container: &Arc<dyn CacheContainer>,
    keys: Vec<String>,
    revalidate: bool,
    concurrency: u32,
    max_retries: u32,
    stats: &Arc<StatsCollector>,
    cancel: &CancellationToken,
) -> Result<usize, FetchError> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1) as usize));
    let mut handles = Vec::with_capacity(keys.len());

    for key in keys {
        let source = Arc::clone(source);
        let container = Arc::clone(container);
        let semaphore = Arc::clone(&semaphore);
        let stats = Arc::clone(stats);
        let cancel = cancel.clone();

        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire()
                .await
                .map_err(|e| FetchError::Network {
                    key: key.clone(),
                    message: e.to_string(),
                })?;

            let fetched =
                fetch_with_retry(&source, &key, revalidate, max_retries, &cancel).await?;

            stats.record_fetched(fetched.body.len() as u64);
            container
                .put(
                    &key,
                    CachedResource::new(fetched.body, fetched.content_type),
                )
                .await
                .map_err(|e| FetchError::Network {
                    key: key.clone(),
                    message: e.to_string(),
                })?;
            debug!("fetched and stored {}", key);
            Ok::<(), FetchError>(())
        }));
    }

    let mut stored = 0usize;
    let mut first_error = None;
    for handle in handles {
        match handle.await {
            Ok(Ok(())) => stored += 1,
            Ok(Err(e)) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(FetchError::Network {
                        key: String::new(),
                        message: format!("fetch task panicked: {e}"),
                    });
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(stored),
    }
}

async fn fetch_with_retry(
    source: &Arc<dyn ResourceSource>,
    key: &str,
    revalidate: bool,
    max_retries: u32,
    cancel: &CancellationToken,
) -> Result<crate::source::FetchedResource, FetchError> {
    for attempt in 0..=max_retries {
        if cancel.is_cancelled() {
            debug!("fetch of {} cancelled", key);
            return Err(FetchError::Network {
                key: key.to_string(),
                message: "operation cancelled".to_string(),
            });
        }

        match source.fetch(key, revalidate).await {
            Ok(fetched) => return Ok(fetched),
            Err(e) if attempt < max_retries => {
                warn!("fetch of {} failed (attempt {}): {}", key, attempt, e);
                tokio::time::sleep(std::time::Duration::from_millis(
                    500 * (attempt as u64 + 1),
                ))
                .await;
            }
            Err(e) => {
                warn!("fetch of {} failed after {} retries: {}", key, max_retries, e);
                return Err(e);
            }
        }
    }
    unreachable!("retry loop always returns")
}
