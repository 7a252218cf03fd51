use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder};
use tracing::{debug, warn};

use super::traits::{FetchedResource, ResourceSource};
use crate::error::FetchError;

/// HTTP resource source rooted at a base URL.
///
/// Resource keys are joined onto the base URL; the canonical root key maps to
/// the base URL itself. Host-supplied headers (auth tokens, tenant ids) are
/// sent with every request and can be swapped at runtime.
pub struct HttpSource {
    client: Client,
    base_url: String,
    headers: RwLock<HashMap<String, String>>,
}

impl HttpSource {
    pub fn new(base_url: String, headers: HashMap<String, String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            headers: RwLock::new(headers),
        }
    }

    /// Replace the request headers (e.g. after a token refresh).
    pub fn update_headers(&self, new_headers: HashMap<String, String>) {
        *self.headers.write() = new_headers;
    }

    /// Absolute URL for a resource key.
    fn url_for(&self, key: &str) -> String {
        let path = key.trim_start_matches('/');
        if path.is_empty() {
            format!("{}/", self.base_url)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Build a GET request with the current headers and optional
    /// cache-bypass directive.
    fn build_request(&self, url: &str, revalidate: bool) -> RequestBuilder {
        let headers = self.headers.read().clone();

        let mut req = self.client.get(url);
        for (k, v) in &headers {
            req = req.header(k.as_str(), v.as_str());
        }
        if revalidate {
            req = req.header("Cache-Control", "no-cache");
        }
        req
    }
}

#[async_trait]
impl ResourceSource for HttpSource {
    async fn fetch(&self, key: &str, revalidate: bool) -> Result<FetchedResource, FetchError> {
        let url = self.url_for(key);
        debug!("http fetch key={} revalidate={}", key, revalidate);

        let resp = self
            .build_request(&url, revalidate)
            .send()
            .await
            .map_err(|e| FetchError::Network {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            warn!("http fetch failed key={} status={}", key, status.as_u16());
            return Err(FetchError::Status {
                key: key.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let body = resp.bytes().await.map_err(|e| FetchError::Network {
            key: key.to_string(),
            message: e.to_string(),
        })?;

        Ok(FetchedResource { body, content_type })
    }
}
