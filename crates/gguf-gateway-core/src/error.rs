//! Error types for the GGUF gateway.
//!
//! Every failure the gateway can produce funnels into [`GatewayError`]. The HTTP
//! layer only needs two things from an error: its registry error code and its
//! message, both of which are exposed here.

use std::time::Duration;
use thiserror::Error;

/// Main error type for the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    // Registry protocol errors
    #[error("{message}")]
    ManifestUnknown { message: String },

    #[error("Blob unknown: {digest}")]
    BlobUnknown { digest: String },

    /// Metadata lookup or template matching failed. Never surfaced to clients;
    /// the resolver logs it and returns a reduced manifest.
    #[error("Metadata enrichment failed: {message}")]
    MetadataEnrichment { message: String },

    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Optional cause description
        cause: Option<String>,
    },

    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    #[error("Upstream returned {status} for {url}")]
    UpstreamStatus { url: String, status: u16 },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Invalid digest: {0}")]
    InvalidDigest(String),

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl GatewayError {
    /// Wrap any failure that prevents a manifest from being resolved.
    ///
    /// The underlying message is kept so clients see why the pull failed.
    pub fn manifest_unknown(cause: impl std::fmt::Display) -> Self {
        GatewayError::ManifestUnknown {
            message: cause.to_string(),
        }
    }

    /// Registry error code used in `{"errors":[{"code": ...}]}` bodies.
    ///
    /// - `MANIFEST_UNKNOWN`: no matching file, or the listing was unusable
    /// - `BLOB_UNKNOWN`: digest was never registered
    /// - `UNKNOWN`: anything else reaching the boundary
    pub fn registry_code(&self) -> &'static str {
        match self {
            GatewayError::ManifestUnknown { .. } => "MANIFEST_UNKNOWN",
            GatewayError::BlobUnknown { .. } => "BLOB_UNKNOWN",
            _ => "UNKNOWN",
        }
    }
}
