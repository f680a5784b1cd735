//! Registry request handlers.

use crate::server::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use gguf_gateway_core::{BlobRequest, BlobResponse, Digest, GatewayError, MediaType};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};

static DOCKER_CONTENT_DIGEST: HeaderName = HeaderName::from_static("docker-content-digest");

/// Registry error body: `{"errors":[{"code": ..., "message": ...}]}`.
#[derive(Debug, Serialize)]
pub struct RegistryErrors {
    pub errors: Vec<RegistryErrorItem>,
}

#[derive(Debug, Serialize)]
pub struct RegistryErrorItem {
    pub code: String,
    pub message: String,
}

/// A handler failure, rendered as a 404 registry error.
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self.0 {
            GatewayError::BlobUnknown { .. } => "Blob Unknown".to_string(),
            other => other.to_string(),
        };
        let body = RegistryErrors {
            errors: vec![RegistryErrorItem {
                code: self.0.registry_code().to_string(),
                message,
            }],
        };
        (StatusCode::NOT_FOUND, Json(body)).into_response()
    }
}

/// Health check endpoint.
pub async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "upstream": state.gateway.config().upstream_base_url,
        "templates": state.gateway.resolver().templates().len(),
    }))
}

/// `GET /v2/` - tells clients this host speaks the registry API.
pub async fn handle_version_check() -> impl IntoResponse {
    Json(json!({}))
}

/// `GET|HEAD /v2/{namespace}/{repo}/manifests/{tag}`
pub async fn handle_manifest(
    State(state): State<Arc<AppState>>,
    Path((namespace, repo, tag)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let manifest = state
        .gateway
        .resolver()
        .resolve(&namespace, &repo, &tag)
        .await
        .map_err(|e| {
            error!("Manifest {}/{}:{} failed: {}", namespace, repo, tag, e);
            e
        })?;

    let body = manifest
        .to_json_bytes()
        .map_err(GatewayError::manifest_unknown)?;
    let digest = Digest::of(&body);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, header_value(MediaType::MANIFEST_V2)),
            (DOCKER_CONTENT_DIGEST.clone(), header_value(digest.as_str())),
        ],
        body,
    )
        .into_response())
}

/// `GET|HEAD /v2/{namespace}/{repo}/blobs/{digest}`
pub async fn handle_blob(
    State(state): State<Arc<AppState>>,
    method: Method,
    Path((_namespace, _repo, digest)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let request = if method == Method::HEAD {
        BlobRequest::Head
    } else {
        BlobRequest::Get
    };

    let response = state.gateway.blobs().resolve(&digest, request).await?;
    debug!("Blob {} -> {:?}", digest, response);

    let digest_header = (DOCKER_CONTENT_DIGEST.clone(), header_value(&digest));
    Ok(match response {
        BlobResponse::Inline { length, body } => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, header_value("application/octet-stream")),
                (header::CONTENT_LENGTH, HeaderValue::from(length)),
                digest_header,
            ],
            body.map(Body::from).unwrap_or_else(Body::empty),
        )
            .into_response(),
        BlobResponse::RemoteHead { length } => (
            StatusCode::OK,
            [(header::CONTENT_LENGTH, HeaderValue::from(length)), digest_header],
        )
            .into_response(),
        BlobResponse::Redirect { url, .. } => Redirect::temporary(&url).into_response(),
    })
}

fn header_value(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static(""))
}
