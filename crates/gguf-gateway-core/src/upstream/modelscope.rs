//! ModelScope hub client.
//!
//! Both endpoints go through the shared [`ResponseCache`], so repeated pulls of the
//! same repository only reach ModelScope once per TTL window.

use super::types::{
    FileEntry, FileListingResponse, GgufMetadata, MetadataRequest, MetadataResponse,
};
use crate::cache::{CacheKey, ResponseCache};
use crate::config::UpstreamConfig;
use crate::error::{GatewayError, Result};
use crate::network::Fetcher;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Client for the model-hosting service.
pub struct ModelHub {
    fetcher: Arc<dyn Fetcher>,
    cache: Arc<ResponseCache>,
    base_url: String,
    ttl: Duration,
}

impl std::fmt::Debug for ModelHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHub")
            .field("base_url", &self.base_url)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl ModelHub {
    /// Create a client for the hub at `base_url`. Responses are cached for the
    /// cache's default TTL.
    pub fn new(fetcher: Arc<dyn Fetcher>, cache: Arc<ResponseCache>, base_url: impl Into<String>) -> Self {
        let ttl = cache.default_ttl();
        Self {
            fetcher,
            cache,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ttl,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn files_url(&self, namespace: &str, repo: &str) -> String {
        format!("{}/api/v1/models/{}/{}/repo/files", self.base_url, namespace, repo)
    }

    pub fn metadata_url(&self) -> String {
        format!(
            "{}/api/v1/rm/fc?Type={}",
            self.base_url,
            UpstreamConfig::FILE_VIEW_TYPE
        )
    }

    /// Direct download URL of a file; blob pulls are redirected here.
    ///
    /// Each path part is percent-encoded as a single segment.
    pub fn resolve_url(&self, namespace: &str, repo: &str, file_name: &str) -> Result<String> {
        let mut url = Url::parse(&self.base_url).map_err(|e| GatewayError::Config {
            message: format!("Invalid upstream base URL {}: {}", self.base_url, e),
        })?;

        url.path_segments_mut()
            .map_err(|_| GatewayError::Config {
                message: format!("Upstream base URL {} cannot carry a path", self.base_url),
            })?
            .pop_if_empty()
            .extend([
                "models",
                namespace,
                repo,
                "resolve",
                UpstreamConfig::DEFAULT_REVISION,
                file_name,
            ]);

        Ok(url.into())
    }

    /// List the files of `namespace/repo`.
    pub async fn list_files(&self, namespace: &str, repo: &str) -> Result<Vec<FileEntry>> {
        let url = self.files_url(namespace, repo);
        let body = self
            .cache
            .get_or_fetch(CacheKey::get(&url), self.ttl, || self.fetcher.get_text(&url))
            .await?;

        let listing: FileListingResponse = serde_json::from_str(&body).map_err(|e| GatewayError::Json {
            message: format!("Failed to parse file listing for {}/{}: {}", namespace, repo, e),
            source: Some(e),
        })?;

        match listing.data {
            Some(data) => {
                debug!("{}/{} lists {} files", namespace, repo, data.files.len());
                Ok(data.files)
            }
            None => Err(GatewayError::Other(format!(
                "File listing for {}/{} has no data: {}",
                namespace,
                repo,
                listing.message.unwrap_or_else(|| "no message".to_string())
            ))),
        }
    }

    /// Fetch the GGUF header metadata the hub extracted from `file_name`.
    pub async fn file_metadata(&self, namespace: &str, repo: &str, file_name: &str) -> Result<GgufMetadata> {
        let url = self.metadata_url();
        let body = serde_json::to_string(&MetadataRequest {
            model_path: namespace,
            model_name: repo,
            file_path: file_name,
        })?;

        let text = self
            .cache
            .get_or_fetch(CacheKey::post(&url, &body), self.ttl, || {
                self.fetcher.post_json_text(&url, &body)
            })
            .await?;

        let response: MetadataResponse = serde_json::from_str(&text)?;
        let raw = response
            .data
            .and_then(|data| data.metadata)
            .ok_or_else(|| GatewayError::MetadataEnrichment {
                message: format!(
                    "No metadata for {}/{}/{}: {}",
                    namespace,
                    repo,
                    file_name,
                    response.message.unwrap_or_default()
                ),
            })?;

        parse_metadata(raw)
    }
}

/// The hub returns metadata as a JSON-encoded string; accept an inline object too.
fn parse_metadata(raw: Value) -> Result<GgufMetadata> {
    let value = match raw {
        Value::String(encoded) => serde_json::from_str::<Value>(&encoded)?,
        other => other,
    };

    match value {
        Value::Object(map) => Ok(GgufMetadata::new(map)),
        other => Err(GatewayError::MetadataEnrichment {
            message: format!("Metadata is not an object: {}", other),
        }),
    }
}
