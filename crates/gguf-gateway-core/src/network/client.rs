//! HTTP client used for every outbound call.
//!
//! Provides:
//! - The [`Fetcher`] seam the upstream client and template loader are written against
//! - A reqwest-backed implementation with a bounded timeout and user agent
//! - Status checking that turns non-2xx responses into errors

use crate::config::NetworkConfig;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Response};
use std::time::Duration;
use tracing::debug;

/// Text-in, text-out access to remote HTTP resources.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url` and return the response body.
    async fn get_text(&self, url: &str) -> Result<String>;

    /// POST a JSON `body` to `url` and return the response body.
    async fn post_json_text(&self, url: &str, body: &str) -> Result<String>;
}

/// HTTP client with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    /// Timeout applied to each request.
    timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client with the upstream timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(NetworkConfig::UPSTREAM_TIMEOUT)
    }

    /// Create a new HTTP client with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(NetworkConfig::USER_AGENT)
            .build()
            .map_err(|e| GatewayError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                cause: None,
            })?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn map_send_error(&self, method: &str, url: &str, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout(self.timeout)
        } else {
            GatewayError::Network {
                message: format!("{} {} failed: {}", method, url, err),
                cause: Some(err.to_string()),
            }
        }
    }

    async fn read_body(&self, response: Response, url: &str) -> Result<String> {
        let response = check_response_status(response, url)?;
        response.text().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout(self.timeout)
            } else {
                GatewayError::Network {
                    message: format!("Failed to read body from {}: {}", url, e),
                    cause: Some(e.to_string()),
                }
            }
        })
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    async fn get_text(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_send_error("GET", url, e))?;

        self.read_body(response, url).await
    }

    async fn post_json_text(&self, url: &str, body: &str) -> Result<String> {
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| self.map_send_error("POST", url, e))?;

        self.read_body(response, url).await
    }
}

fn check_response_status(response: Response, url: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    Err(GatewayError::UpstreamStatus {
        url: url.to_string(),
        status: status.as_u16(),
    })
}

/// Extract domain from a URL.
pub fn extract_domain(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.host_str().unwrap_or("unknown").to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}
