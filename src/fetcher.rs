use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use tracing::debug;

use crate::error::{FetchError, Result};

/// Anything that can hand a watcher its next listing document.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch(&self) -> std::result::Result<serde_json::Value, FetchError>;

    /// Endpoint description for logs.
    fn endpoint(&self) -> &str;
}

/// Build the shared HTTP client. The timeout bounds every fetch and delivery
/// call so a hung remote cannot stall a watcher loop.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// GET a JSON document with bearer-token auth.
pub async fn fetch_json(
    client: &reqwest::Client,
    endpoint: &str,
    auth_token: &str,
) -> std::result::Result<serde_json::Value, FetchError> {
    let resp = client
        .get(endpoint)
        .header(AUTHORIZATION, format!("Bearer {auth_token}"))
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(FetchError::Transport)?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status { status: status.as_u16() });
    }

    let body = resp.text().await.map_err(FetchError::Transport)?;
    debug!(endpoint, bytes = body.len(), "fetched listing document");
    serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))
}

/// A fixed endpoint plus the credentials to read it.
pub struct FetchClient {
    client: reqwest::Client,
    endpoint: String,
    auth_token: String,
}

impl FetchClient {
    pub fn new(client: reqwest::Client, endpoint: String, auth_token: String) -> Self {
        Self { client, endpoint, auth_token }
    }
}

#[async_trait]
impl ListingSource for FetchClient {
    async fn fetch(&self) -> std::result::Result<serde_json::Value, FetchError> {
        fetch_json(&self.client, &self.endpoint, &self.auth_token).await
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
