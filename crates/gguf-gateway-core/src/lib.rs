//! GGUF gateway core - the headless half of a registry front-end for GGUF models.
//!
//! Container-registry clients pull `namespace/repo:tag`; this crate turns that
//! into a manifest describing a GGUF file hosted on ModelScope plus a matching
//! chat template and parameter set, and keeps the digest table blob requests are
//! answered from. It has no HTTP server of its own; see the `gguf-gateway`
//! binary for that.
//!
//! # Example
//!
//! ```rust,ignore
//! use gguf_gateway_core::{Gateway, GatewayConfig};
//!
//! #[tokio::main]
//! async fn main() -> gguf_gateway_core::Result<()> {
//!     let gateway = Gateway::start(GatewayConfig::default()).await?;
//!
//!     let manifest = gateway.resolver().resolve("qwen", "Qwen2-7B-Instruct-GGUF", "latest").await?;
//!     println!("{} layers", manifest.layers.len());
//!
//!     Ok(())
//! }
//! ```

pub mod blobs;
pub mod cache;
pub mod config;
pub mod digest;
pub mod error;
pub mod manifest;
pub mod network;
pub mod templates;
pub mod upstream;

// Re-export commonly used types
pub use blobs::{BlobRecord, BlobRequest, BlobResponse, BlobStore};
pub use cache::{CacheKey, ResponseCache};
pub use config::{GatewayConfig, TemplateSourceConfig};
pub use digest::Digest;
pub use error::{GatewayError, Result};
pub use manifest::{Descriptor, ManifestDocument, ManifestResolver, ManifestTag, MediaType};
pub use network::{Fetcher, HttpClient};
pub use templates::{TemplateEntry, TemplateRegistry};
pub use upstream::{FileEntry, GgufMetadata, ModelHub};

use crate::config::NetworkConfig;
use std::sync::Arc;
use tracing::info;

/// Fully wired gateway state shared by request handlers.
#[derive(Debug, Clone)]
pub struct Gateway {
    resolver: ManifestResolver,
    config: Arc<GatewayConfig>,
}

impl Gateway {
    /// Build every component from `config`, loading templates over HTTP.
    ///
    /// Returns once the template registry is complete.
    pub async fn start(config: GatewayConfig) -> Result<Self> {
        config.validate()?;
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpClient::with_timeout(config.upstream_timeout())?);
        let template_fetcher = HttpClient::with_timeout(NetworkConfig::TEMPLATE_FETCH_TIMEOUT)?;
        let templates = TemplateRegistry::build(&template_fetcher, &config.template_sources).await;
        Ok(Self::with_parts(config, fetcher, templates))
    }

    /// Assemble a gateway from an existing fetcher and template registry.
    pub fn with_parts(config: GatewayConfig, fetcher: Arc<dyn Fetcher>, templates: TemplateRegistry) -> Self {
        let cache = Arc::new(ResponseCache::with_ttl(config.cache_ttl()));
        let hub = Arc::new(ModelHub::new(fetcher, cache, config.upstream_base_url.clone()));
        let resolver = ManifestResolver::new(hub, Arc::new(templates), BlobStore::new());

        info!(
            "Gateway ready: upstream {}, {} templates, cache TTL {:?}",
            config.upstream_base_url,
            resolver.templates().len(),
            config.cache_ttl()
        );

        Self {
            resolver,
            config: Arc::new(config),
        }
    }

    pub fn resolver(&self) -> &ManifestResolver {
        &self.resolver
    }

    pub fn blobs(&self) -> &BlobStore {
        self.resolver.blobs()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}
