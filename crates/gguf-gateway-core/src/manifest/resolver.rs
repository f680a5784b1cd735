//! Manifest resolution.
//!
//! Turns `namespace/repo:tag` into a manifest by picking an upstream GGUF file,
//! registering it as a redirect blob, and (best effort) adding a config, chat
//! template and parameter layers built from the file's metadata.

use super::select::select_model_file;
use super::tag::ManifestTag;
use super::types::{Descriptor, ManifestDocument, MediaType, ModelConfig};
use crate::blobs::BlobStore;
use crate::digest::Digest;
use crate::error::{GatewayError, Result};
use crate::templates::TemplateRegistry;
use crate::upstream::{FileEntry, ModelHub};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{info, warn};

/// Config and extra layers derived from file metadata.
#[derive(Debug)]
struct Enrichment {
    config: Descriptor,
    layers: Vec<Descriptor>,
}

/// Resolves manifests against the upstream hub.
#[derive(Debug, Clone)]
pub struct ManifestResolver {
    hub: Arc<ModelHub>,
    templates: Arc<TemplateRegistry>,
    blobs: BlobStore,
}

impl ManifestResolver {
    pub fn new(hub: Arc<ModelHub>, templates: Arc<TemplateRegistry>, blobs: BlobStore) -> Self {
        Self {
            hub,
            templates,
            blobs,
        }
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    /// Resolve `namespace/repo:tag` into a manifest.
    ///
    /// Fails with `ManifestUnknown` when no file matches or the listing cannot be
    /// fetched. Metadata problems only drop the config/template/params layers.
    pub async fn resolve(&self, namespace: &str, repo: &str, tag: &str) -> Result<ManifestDocument> {
        let tag = ManifestTag::parse(tag);

        let (file, model_digest) = self
            .locate_model(namespace, repo, &tag)
            .await
            .map_err(|e| match e {
                GatewayError::ManifestUnknown { .. } => e,
                other => GatewayError::manifest_unknown(other),
            })?;

        let mut layers = vec![Descriptor::new(MediaType::MODEL, file.size, model_digest)];

        let config = match self.enrich(namespace, repo, &file, &tag).await {
            Ok(enrichment) => {
                layers.extend(enrichment.layers);
                Some(enrichment.config)
            }
            Err(e) => {
                warn!(
                    "Serving {}/{}:{} without metadata layers: {}",
                    namespace, repo, file.name, e
                );
                None
            }
        };

        info!(
            "Resolved {}/{}:{} to {} ({} layers)",
            namespace,
            repo,
            tag.quant,
            file.name,
            layers.len()
        );

        Ok(ManifestDocument::new(config, layers))
    }

    /// Pick the upstream file and register its redirect blob.
    async fn locate_model(&self, namespace: &str, repo: &str, tag: &ManifestTag) -> Result<(FileEntry, Digest)> {
        let files = self.hub.list_files(namespace, repo).await?;

        let file = select_model_file(&files, tag)
            .cloned()
            .ok_or_else(|| GatewayError::ManifestUnknown {
                message: format!("No GGUF file in {}/{} matches tag {:?}", namespace, repo, tag.quant),
            })?;

        // The upstream hash is trusted as-is; content is never downloaded here.
        let digest = Digest::from_hex(&file.sha256)?;
        let url = self.hub.resolve_url(namespace, repo, &file.name)?;
        self.blobs.register_redirect(digest.clone(), url, file.size).await;

        Ok((file, digest))
    }

    async fn enrich(&self, namespace: &str, repo: &str, file: &FileEntry, tag: &ManifestTag) -> Result<Enrichment> {
        let metadata = self
            .hub
            .file_metadata(namespace, repo, &file.name)
            .await
            .map_err(|e| GatewayError::MetadataEnrichment {
                message: e.to_string(),
            })?;

        let config_bytes = Bytes::from(serde_json::to_vec(&ModelConfig::from_metadata(&metadata))?);
        let config = Descriptor::new(
            MediaType::IMAGE_CONFIG,
            config_bytes.len() as u64,
            self.blobs.store_inline(config_bytes).await,
        );

        let mut layers = Vec::new();
        let chat_template = metadata.chat_template();
        if let Some(template) = self
            .templates
            .match_template(chat_template.as_deref(), &tag.template_override)
        {
            layers.push(self.inline_layer(MediaType::TEMPLATE, &template.body).await);
            if let Some(params) = &template.params {
                layers.push(self.inline_layer(MediaType::PARAMS, params).await);
            }
        }

        Ok(Enrichment { config, layers })
    }

    async fn inline_layer(&self, media_type: &str, content: &str) -> Descriptor {
        let content = Bytes::copy_from_slice(content.as_bytes());
        let size = content.len() as u64;
        let digest = self.blobs.store_inline(content).await;
        Descriptor::new(media_type, size, digest)
    }
}
