//! Content-addressed blob table.
//!
//! Small synthesized artifacts (config, template, params) are kept inline. The
//! model file itself is never stored; its digest maps to the upstream URL and
//! clients are redirected there.

use crate::digest::Digest;
use crate::error::{GatewayError, Result};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// What a digest resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobRecord {
    Inline(Bytes),
    Redirect { url: String, length: u64 },
}

impl BlobRecord {
    pub fn length(&self) -> u64 {
        match self {
            BlobRecord::Inline(content) => content.len() as u64,
            BlobRecord::Redirect { length, .. } => *length,
        }
    }
}

/// Whether the client asked for the body or only the headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobRequest {
    Head,
    Get,
}

/// How to answer a blob request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobResponse {
    /// Inline content; `body` is `None` for HEAD.
    Inline { length: u64, body: Option<Bytes> },
    /// Redirect the client to the upstream copy.
    Redirect { url: String, length: u64 },
    /// HEAD of an upstream-backed blob: only the length is reported.
    RemoteHead { length: u64 },
}

/// Shared digest → blob table. Writes are first-writer-wins.
#[derive(Debug, Clone, Default)]
pub struct BlobStore {
    records: Arc<RwLock<HashMap<Digest, BlobRecord>>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register content under its computed digest and return that digest.
    ///
    /// Inline blobs can only enter the table this way, so a served body always
    /// hashes to the digest it was requested by.
    pub async fn store_inline(&self, content: impl Into<Bytes>) -> Digest {
        let content = content.into();
        let digest = Digest::of(&content);
        self.register(digest.clone(), BlobRecord::Inline(content)).await;
        digest
    }

    /// Register a redirect to `url` for a blob of `length` bytes.
    ///
    /// Returns `false` if the digest was already registered.
    pub async fn register_redirect(&self, digest: Digest, url: impl Into<String>, length: u64) -> bool {
        self.register(
            digest,
            BlobRecord::Redirect {
                url: url.into(),
                length,
            },
        )
        .await
    }

    async fn register(&self, digest: Digest, record: BlobRecord) -> bool {
        let mut records = self.records.write().await;
        if records.contains_key(&digest) {
            return false;
        }
        debug!("Registered blob {} ({} bytes)", digest, record.length());
        records.insert(digest, record);
        true
    }

    pub async fn get(&self, digest: &Digest) -> Option<BlobRecord> {
        self.records.read().await.get(digest).cloned()
    }

    /// Answer a blob request for `digest`.
    pub async fn resolve(&self, digest: &str, request: BlobRequest) -> Result<BlobResponse> {
        let unknown = || GatewayError::BlobUnknown {
            digest: digest.to_string(),
        };
        let parsed = Digest::parse(digest).map_err(|_| unknown())?;
        let record = self.get(&parsed).await.ok_or_else(unknown)?;

        Ok(match (record, request) {
            (BlobRecord::Inline(content), BlobRequest::Get) => BlobResponse::Inline {
                length: content.len() as u64,
                body: Some(content),
            },
            (BlobRecord::Inline(content), BlobRequest::Head) => BlobResponse::Inline {
                length: content.len() as u64,
                body: None,
            },
            (BlobRecord::Redirect { url, length }, BlobRequest::Get) => {
                BlobResponse::Redirect { url, length }
            }
            (BlobRecord::Redirect { length, .. }, BlobRequest::Head) => {
                BlobResponse::RemoteHead { length }
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
