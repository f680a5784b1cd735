//! Manifest documents and the synthetic image config.

use crate::digest::Digest;
use crate::error::Result;
use crate::upstream::GgufMetadata;
use serde::{Serialize, Serializer};

/// Media types used in synthesized manifests.
pub struct MediaType;

impl MediaType {
    pub const MANIFEST_V2: &'static str = "application/vnd.docker.distribution.manifest.v2+json";
    pub const IMAGE_CONFIG: &'static str = "application/vnd.docker.container.image.v1+json";
    pub const MODEL: &'static str = "application/vnd.ollama.image.model";
    pub const TEMPLATE: &'static str = "application/vnd.ollama.image.template";
    pub const PARAMS: &'static str = "application/vnd.ollama.image.params";
}

/// One artifact referenced by a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub media_type: String,
    pub size: u64,
    pub digest: Digest,
}

impl Descriptor {
    pub fn new(media_type: &str, size: u64, digest: Digest) -> Self {
        Self {
            media_type: media_type.to_string(),
            size,
            digest,
        }
    }
}

/// Docker distribution v2 manifest.
///
/// Layers are ordered model, template, params. A missing config serializes as
/// `{}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestDocument {
    pub schema_version: u32,
    pub media_type: String,
    #[serde(serialize_with = "config_or_empty")]
    pub config: Option<Descriptor>,
    pub layers: Vec<Descriptor>,
}

fn config_or_empty<S: Serializer>(config: &Option<Descriptor>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match config {
        Some(descriptor) => descriptor.serialize(serializer),
        None => serde_json::Map::new().serialize(serializer),
    }
}

impl ManifestDocument {
    pub fn new(config: Option<Descriptor>, layers: Vec<Descriptor>) -> Self {
        Self {
            schema_version: 2,
            media_type: MediaType::MANIFEST_V2.to_string(),
            config,
            layers,
        }
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// The model layer; always the first one.
    pub fn model_layer(&self) -> Option<&Descriptor> {
        self.layers.first()
    }

    pub fn layer(&self, media_type: &str) -> Option<&Descriptor> {
        self.layers.iter().find(|layer| layer.media_type == media_type)
    }
}

/// Image config blob describing a GGUF model to Ollama-style clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelConfig {
    pub model_format: String,
    pub model_family: String,
    pub model_families: Vec<String>,
    pub model_type: String,
    pub file_type: String,
    pub architecture: String,
    pub os: String,
    pub rootfs: RootFs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootFs {
    #[serde(rename = "type")]
    pub kind: String,
    pub diff_ids: Vec<String>,
}

impl ModelConfig {
    /// Config for a GGUF file of the given family (`general.architecture`) and
    /// size (`general.size_label`). Absent values become empty strings.
    pub fn gguf(family: Option<String>, size_label: Option<String>) -> Self {
        let family = family.unwrap_or_default();
        Self {
            model_format: "gguf".to_string(),
            model_families: vec![family.clone()],
            model_family: family,
            model_type: size_label.unwrap_or_default(),
            file_type: "unknown".to_string(),
            architecture: "amd64".to_string(),
            os: "linux".to_string(),
            rootfs: RootFs {
                kind: "layers".to_string(),
                diff_ids: Vec::new(),
            },
        }
    }

    pub fn from_metadata(metadata: &GgufMetadata) -> Self {
        Self::gguf(metadata.architecture(), metadata.size_label())
    }
}
