//! ModelScope API payloads and the file entries derived from them.

use crate::config::ManifestConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response of `GET /api/v1/models/{ns}/{repo}/repo/files`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileListingResponse {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub data: Option<FileListingData>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileListingData {
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

/// One file hosted in an upstream repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileEntry {
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub size: u64,
    /// Hex SHA256 of the content as declared by the upstream.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sha256: String,
    #[serde(default, rename = "Type")]
    pub kind: String,
    #[serde(default, rename = "IsLFS")]
    pub is_lfs: bool,
    #[serde(default)]
    pub revision: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl FileEntry {
    /// Part of a split model (`model-00001-of-00002.gguf`).
    pub fn is_sharded(&self) -> bool {
        self.name.contains(ManifestConfig::SHARD_MARKER)
    }

    /// A whole GGUF file that can be served on its own.
    pub fn is_servable_model(&self) -> bool {
        self.name.ends_with(ManifestConfig::MODEL_EXTENSION) && !self.is_sharded()
    }

    /// Quantization label: the last `-` segment of the name, up to its first `.`,
    /// uppercased (`qwen2-7b-instruct-q4_k_m.gguf` → `Q4_K_M`).
    pub fn quant_label(&self) -> String {
        quant_label(&self.name)
    }
}

/// See [`FileEntry::quant_label`].
pub fn quant_label(file_name: &str) -> String {
    let last_segment = file_name.rsplit('-').next().unwrap_or(file_name);
    let stem = last_segment.split('.').next().unwrap_or(last_segment);
    stem.to_uppercase()
}

/// Body of `POST /api/v1/rm/fc?Type=model_view`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRequest<'a> {
    pub model_path: &'a str,
    pub model_name: &'a str,
    pub file_path: &'a str,
}

/// Response of the metadata endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetadataResponse {
    #[serde(default)]
    pub data: Option<MetadataData>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetadataData {
    /// GGUF key/value metadata, usually as a JSON-encoded string.
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// GGUF header key/values of one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GgufMetadata(Map<String, Value>);

impl GgufMetadata {
    pub fn new(values: Map<String, Value>) -> Self {
        Self(values)
    }

    /// Text form of a scalar value; `None` when absent or structured.
    pub fn string_value(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// `general.architecture`, e.g. `qwen2`.
    pub fn architecture(&self) -> Option<String> {
        self.string_value("general.architecture")
    }

    /// `general.size_label`, e.g. `7B`.
    pub fn size_label(&self) -> Option<String> {
        self.string_value("general.size_label")
    }

    /// `tokenizer.chat_template`, the Jinja chat template embedded in the file.
    pub fn chat_template(&self) -> Option<String> {
        self.string_value("tokenizer.chat_template")
    }
}
