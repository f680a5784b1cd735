//! HTTP server implementation using Axum.

use crate::handler::{handle_blob, handle_health, handle_manifest, handle_version_check};
use axum::{routing::get, Router};
use gguf_gateway_core::Gateway;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers.
pub struct AppState {
    pub gateway: Gateway,
}

/// Build the registry router.
///
/// `get` routes also answer HEAD; handlers look at the method where the two differ.
pub fn build_router(gateway: Gateway) -> Router {
    let state = Arc::new(AppState { gateway });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/v2", get(handle_version_check))
        .route("/v2/", get(handle_version_check))
        .route("/v2/:namespace/:repo/manifests/:tag", get(handle_manifest))
        .route("/v2/:namespace/:repo/blobs/:digest", get(handle_blob))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the registry HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(gateway: Gateway, host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    let app = build_router(gateway);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}
