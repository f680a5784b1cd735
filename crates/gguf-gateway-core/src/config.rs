//! Centralized configuration for the gateway.
//!
//! Fixed protocol constants live in the `*Config` tables. Values an operator may
//! want to change at startup live in [`GatewayConfig`].

use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    /// Listing and metadata endpoints can be slow for large repositories.
    pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(300);
    pub const TEMPLATE_FETCH_TIMEOUT: Duration = Duration::from_secs(60);
    pub const USER_AGENT: &'static str = "gguf-gateway/0.1";
}

/// Response cache configuration.
pub struct CacheConfig;

impl CacheConfig {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);
    pub const MAX_CAPACITY: u64 = 10_000;
    /// Upper bound applied by the backing store regardless of per-entry TTL.
    pub const MAX_TTL: Duration = Duration::from_secs(24 * 60 * 60);
}

/// ModelScope API shapes.
pub struct UpstreamConfig;

impl UpstreamConfig {
    pub const MODELSCOPE_BASE: &'static str = "https://www.modelscope.cn";
    pub const FILE_VIEW_TYPE: &'static str = "model_view";
    pub const DEFAULT_REVISION: &'static str = "master";
}

/// Manifest synthesis constants.
pub struct ManifestConfig;

impl ManifestConfig {
    pub const MODEL_EXTENSION: &'static str = ".gguf";
    pub const SHARD_MARKER: &'static str = "-of-";
    /// Separates the quant tag from a template override, e.g. `q4_k_m--chatml`.
    pub const TAG_SEPARATOR: &'static str = "--";
    pub const LATEST_TAG: &'static str = "latest";
    /// Quantizations eligible for `latest`, in preference order.
    pub const PREFERRED_QUANTS: [&'static str; 3] = ["Q4_K_M", "Q4_0", "Q8_0"];
}

/// One remote template index.
///
/// The index at `index_url` is a JSON array of `{name, template}`; each name has
/// `{files_base_url}/{name}.gotmpl` and `{files_base_url}/{name}.json` next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSourceConfig {
    /// Short label used in log lines.
    pub label: String,
    pub index_url: String,
    pub files_base_url: String,
}

impl TemplateSourceConfig {
    pub fn template_url(&self, name: &str) -> String {
        format!("{}/{}.gotmpl", self.files_base_url.trim_end_matches('/'), name)
    }

    pub fn params_url(&self, name: &str) -> String {
        format!("{}/{}.json", self.files_base_url.trim_end_matches('/'), name)
    }
}

/// Runtime configuration for the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct GatewayConfig {
    /// Base URL of the model-hosting service.
    pub upstream_base_url: String,
    /// TTL for cached upstream responses, in minutes.
    pub cache_ttl_minutes: u64,
    /// Timeout applied to each outbound upstream request.
    pub upstream_timeout_secs: u64,
    /// Template indexes, earlier sources win on name collisions.
    pub template_sources: Vec<TemplateSourceConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            upstream_base_url: UpstreamConfig::MODELSCOPE_BASE.to_string(),
            cache_ttl_minutes: CacheConfig::DEFAULT_TTL.as_secs() / 60,
            upstream_timeout_secs: NetworkConfig::UPSTREAM_TIMEOUT.as_secs(),
            template_sources: vec![
                TemplateSourceConfig {
                    label: "ollama".to_string(),
                    index_url: "https://fastly.jsdelivr.net/gh/ollama/ollama/template/index.json"
                        .to_string(),
                    files_base_url: "https://fastly.jsdelivr.net/gh/ollama/ollama/template"
                        .to_string(),
                },
                TemplateSourceConfig {
                    label: "onllama".to_string(),
                    index_url:
                        "https://raw.githubusercontent.com/onllama/templates/refs/heads/main/index.json"
                            .to_string(),
                    files_base_url: "https://fastly.jsdelivr.net/gh/onllama/templates".to_string(),
                },
            ],
        }
    }
}

impl GatewayConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| GatewayError::Config {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;
        let config: GatewayConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_minutes * 60)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    /// Reject values the gateway cannot run with.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.upstream_base_url).map_err(|e| GatewayError::Config {
            message: format!("Invalid upstream_base_url {:?}: {}", self.upstream_base_url, e),
        })?;

        if self.upstream_timeout_secs == 0 {
            return Err(GatewayError::Config {
                message: "upstream_timeout_secs must be greater than zero".to_string(),
            });
        }

        if self.cache_ttl() > CacheConfig::MAX_TTL {
            return Err(GatewayError::Config {
                message: format!(
                    "cache_ttl_minutes must be at most {}",
                    CacheConfig::MAX_TTL.as_secs() / 60
                ),
            });
        }

        for source in &self.template_sources {
            url::Url::parse(&source.index_url).map_err(|e| GatewayError::Config {
                message: format!("Invalid index_url for {}: {}", source.label, e),
            })?;
        }

        Ok(())
    }
}
