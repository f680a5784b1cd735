//! Chat template registry.
//!
//! Built once at startup from remote template indexes. Each index lists
//! `{name, template}` pairs where `template` is the Jinja chat template a GGUF
//! file would carry in `tokenizer.chat_template`; the trimmed text acts as a
//! fingerprint that maps back to the Go template body and default parameters
//! published under the same name.

use crate::config::TemplateSourceConfig;
use crate::error::Result;
use crate::network::{extract_domain, Fetcher};
use futures::future::join_all;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// One known template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateEntry {
    pub name: String,
    /// Trimmed chat template text used as the lookup key.
    pub fingerprint: String,
    /// Go template body (`.gotmpl`).
    pub body: String,
    /// Default parameters JSON, when the source publishes one.
    pub params: Option<String>,
}

/// Index item as published by a template source.
#[derive(Debug, Clone, Deserialize)]
struct IndexItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    template: Option<String>,
}

/// Read-only lookup tables: fingerprint → name and name → entry.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    names_by_fingerprint: HashMap<String, String>,
    entries: HashMap<String, TemplateEntry>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. The first entry registered under a name or fingerprint wins;
    /// returns `false` when the name was already taken.
    pub fn insert(&mut self, entry: TemplateEntry) -> bool {
        if self.entries.contains_key(&entry.name) {
            return false;
        }

        if !entry.fingerprint.is_empty() {
            self.names_by_fingerprint
                .entry(entry.fingerprint.clone())
                .or_insert_with(|| entry.name.clone());
        }
        self.entries.insert(entry.name.clone(), entry);
        true
    }

    /// Fetch every source's index and each listed template in parallel.
    ///
    /// A failing index or entry is logged and skipped; the registry holds whatever
    /// loaded. Sources earlier in `sources` take precedence on name collisions.
    pub async fn build(fetcher: &dyn Fetcher, sources: &[TemplateSourceConfig]) -> Self {
        let indexes = join_all(sources.iter().map(|source| fetch_index(fetcher, source))).await;

        let loads = indexes
            .iter()
            .zip(sources)
            .flat_map(|(items, source)| items.iter().map(move |item| (source, item)))
            .map(|(source, item)| load_entry(fetcher, source, item));
        let loaded = join_all(loads).await;

        let mut registry = Self::new();
        for entry in loaded.into_iter().flatten() {
            let name = entry.name.clone();
            if !registry.insert(entry) {
                debug!("Template {} already registered by an earlier source", name);
            }
        }

        info!(
            "Loaded {} chat templates ({} fingerprints) from {} sources",
            registry.len(),
            registry.names_by_fingerprint.len(),
            sources.len()
        );
        registry
    }

    /// Pick a template for a model.
    ///
    /// Looks up the trimmed `chat_template` fingerprint first; when that finds
    /// nothing and `override_name` names a known template, that one is used.
    pub fn match_template(
        &self,
        chat_template: Option<&str>,
        override_name: &str,
    ) -> Option<&TemplateEntry> {
        let by_fingerprint = chat_template
            .map(str::trim)
            .filter(|fingerprint| !fingerprint.is_empty())
            .and_then(|fingerprint| self.names_by_fingerprint.get(fingerprint))
            .and_then(|name| self.entries.get(name));

        by_fingerprint.or_else(|| {
            if override_name.is_empty() {
                None
            } else {
                self.entries.get(override_name)
            }
        })
    }

    pub fn get(&self, name: &str) -> Option<&TemplateEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

async fn fetch_index(fetcher: &dyn Fetcher, source: &TemplateSourceConfig) -> Vec<IndexItem> {
    let parsed: Result<Vec<IndexItem>> = async {
        let body = fetcher.get_text(&source.index_url).await?;
        Ok(serde_json::from_str(&body)?)
    }
    .await;

    match parsed {
        Ok(items) => {
            debug!(
                "Template index {} ({}) lists {} entries",
                source.label,
                extract_domain(&source.index_url),
                items.len()
            );
            items
        }
        Err(e) => {
            warn!("Skipping template source {}: {}", source.label, e);
            Vec::new()
        }
    }
}

async fn load_entry(
    fetcher: &dyn Fetcher,
    source: &TemplateSourceConfig,
    item: &IndexItem,
) -> Option<TemplateEntry> {
    let fingerprint = match &item.template {
        Some(template) if !item.name.is_empty() => template.trim().to_string(),
        _ => {
            warn!("Skipping malformed entry {:?} in {}", item.name, source.label);
            return None;
        }
    };

    let template_url = source.template_url(&item.name);
    let params_url = source.params_url(&item.name);
    let (body, params) = futures::join!(
        fetcher.get_text(&template_url),
        fetcher.get_text(&params_url),
    );

    let body = match body {
        Ok(body) => body,
        Err(e) => {
            warn!("Skipping template {} from {}: {}", item.name, source.label, e);
            return None;
        }
    };

    let params = match params {
        Ok(params) => Some(params),
        Err(e) => {
            warn!("No params for template {} from {}: {}", item.name, source.label, e);
            None
        }
    };

    Some(TemplateEntry {
        name: item.name.clone(),
        fingerprint,
        body,
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use async_trait::async_trait;
    use serde_json::json;

    struct MapFetcher(HashMap<String, String>);

    #[async_trait]
    impl Fetcher for MapFetcher {
        async fn get_text(&self, url: &str) -> Result<String> {
            self.0.get(url).cloned().ok_or(GatewayError::UpstreamStatus {
                url: url.to_string(),
                status: 404,
            })
        }

        async fn post_json_text(&self, url: &str, _body: &str) -> Result<String> {
            Err(GatewayError::UpstreamStatus {
                url: url.to_string(),
                status: 405,
            })
        }
    }

    fn source(label: &str) -> TemplateSourceConfig {
        TemplateSourceConfig {
            label: label.to_string(),
            index_url: format!("https://{}.test/index.json", label),
            files_base_url: format!("https://{}.test", label),
        }
    }

    fn entry(name: &str, fingerprint: &str) -> TemplateEntry {
        TemplateEntry {
            name: name.to_string(),
            fingerprint: fingerprint.to_string(),
            body: format!("{{{{ .Prompt }}}} {}", name),
            params: None,
        }
    }

    #[test]
    fn test_first_registration_wins() {
        let mut registry = TemplateRegistry::new();
        assert!(registry.insert(entry("chatml", "<|im_start|>")));
        assert!(!registry.insert(TemplateEntry {
            body: "other".into(),
            ..entry("chatml", "<|im_start|>")
        }));
        assert_eq!(registry.len(), 1);
        assert_ne!(registry.get("chatml").unwrap().body, "other");
    }

    #[test]
    fn test_match_by_trimmed_fingerprint() {
        let mut registry = TemplateRegistry::new();
        registry.insert(entry("llama3-instruct", "{{ bos_token }}<|start_header_id|>"));

        let matched = registry.match_template(Some("  {{ bos_token }}<|start_header_id|>\n"), "");
        assert_eq!(matched.map(|e| e.name.as_str()), Some("llama3-instruct"));
    }

    #[test]
    fn test_match_falls_back_to_override() {
        let mut registry = TemplateRegistry::new();
        registry.insert(entry("chatml", "<|im_start|>"));
        registry.insert(entry("zephyr", "<|user|>"));

        let matched = registry.match_template(Some("unknown template"), "zephyr");
        assert_eq!(matched.map(|e| e.name.as_str()), Some("zephyr"));

        let matched = registry.match_template(None, "zephyr");
        assert_eq!(matched.map(|e| e.name.as_str()), Some("zephyr"));

        // Fingerprint wins over the override.
        let matched = registry.match_template(Some("<|im_start|>"), "zephyr");
        assert_eq!(matched.map(|e| e.name.as_str()), Some("chatml"));
    }

    #[test]
    fn test_no_match() {
        let mut registry = TemplateRegistry::new();
        registry.insert(entry("chatml", "<|im_start|>"));
        assert!(registry.match_template(Some("something else"), "").is_none());
        assert!(registry.match_template(None, "not-a-template").is_none());
        assert!(registry.match_template(Some("   "), "").is_none());
    }

    #[tokio::test]
    async fn test_build_skips_failures_and_prefers_earlier_sources() {
        let first = source("first");
        let second = source("second");
        let broken = source("broken");

        let mut files = HashMap::new();
        files.insert(
            first.index_url.clone(),
            json!([
                {"name": "chatml", "template": "<|im_start|>\n"},
                {"name": "missing-body", "template": "<x>"},
                {"name": "no-template"}
            ])
            .to_string(),
        );
        files.insert(first.template_url("chatml"), "first chatml".into());
        files.insert(first.params_url("chatml"), r#"{"stop":["<|im_end|>"]}"#.into());
        files.insert(
            second.index_url.clone(),
            json!([
                {"name": "chatml", "template": "<|im_start|>"},
                {"name": "gemma", "template": "<start_of_turn>"}
            ])
            .to_string(),
        );
        files.insert(second.template_url("chatml"), "second chatml".into());
        files.insert(second.template_url("gemma"), "gemma body".into());

        let fetcher = MapFetcher(files);
        let registry = TemplateRegistry::build(&fetcher, &[first, broken, second]).await;

        assert_eq!(registry.len(), 2);
        let chatml = registry.get("chatml").unwrap();
        assert_eq!(chatml.body, "first chatml");
        assert_eq!(chatml.params.as_deref(), Some(r#"{"stop":["<|im_end|>"]}"#));
        assert_eq!(chatml.fingerprint, "<|im_start|>");

        let gemma = registry.get("gemma").unwrap();
        assert_eq!(gemma.params, None);
        assert!(!registry.contains("missing-body"));
        assert!(!registry.contains("no-template"));
    }
}
