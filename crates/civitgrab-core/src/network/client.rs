//! reqwest-backed [`ModelSource`] for the Civitai REST API.
//!
//! Two clients are kept: artifact streams only ever get a connect timeout so
//! multi-gigabyte downloads are not cut off halfway, while metadata requests
//! take an optional total timeout from [`ClientConfig`].

use super::source::{FetchedModel, ModelSource};
use crate::config::{ClientConfig, NetworkConfig};
use crate::error::{CivitError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// HTTP client for the Civitai API.
pub struct CivitClient {
    api: Client,
    downloads: Client,
    config: ClientConfig,
}

impl CivitClient {
    /// Create a client with default configuration and no token.
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let mut api = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(NetworkConfig::USER_AGENT);
        if let Some(timeout) = config.request_timeout {
            api = api.timeout(timeout);
        }
        let api = api
            .build()
            .map_err(|e| CivitError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(e),
            })?;

        let downloads = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(NetworkConfig::USER_AGENT)
            .build()
            .map_err(|e| CivitError::Network {
                message: format!("Failed to create download client: {}", e),
                source: Some(e),
            })?;

        Ok(Self {
            api,
            downloads,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Metadata endpoint of a model.
    pub fn model_endpoint(&self, model_id: u64) -> String {
        format!(
            "{}/models/{}",
            self.config.api_base.trim_end_matches('/'),
            model_id
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.query(&[(NetworkConfig::TOKEN_QUERY_PARAM, token.as_str())]),
            None => request,
        }
    }
}

/// Only a plain 200 carries a model document; any other status, 2xx
/// included, is a failed lookup.
fn accepts_metadata_status(status: StatusCode) -> bool {
    status == StatusCode::OK
}

#[async_trait]
impl ModelSource for CivitClient {
    async fn fetch_model(&self, model_id: u64) -> Result<FetchedModel> {
        let url = self.model_endpoint(model_id);
        debug!("GET {}", url);

        let response = self
            .authorize(self.api.get(&url))
            .send()
            .await
            .map_err(|e| CivitError::Network {
                message: format!("GET {} failed: {}", url, e),
                source: Some(e),
            })?;

        let status = response.status();
        if !accepts_metadata_status(status) {
            let body = response.text().await.unwrap_or_default();
            return Err(CivitError::Fetch {
                model_id,
                status: Some(status.as_u16()),
                message: format!("HTTP {}: {}", status, body.trim()),
            });
        }

        let raw: serde_json::Value = response.json().await.map_err(|e| CivitError::Fetch {
            model_id,
            status: Some(status.as_u16()),
            message: format!("Response is not JSON: {}", e),
        })?;

        FetchedModel::from_value(model_id, raw)
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<u64> {
        let response = self
            .authorize(self.downloads.get(url))
            .send()
            .await
            .map_err(|e| CivitError::Network {
                message: format!("Download request failed: {}", e),
                source: Some(e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CivitError::DownloadFailed {
                url: url.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(|e| CivitError::io_with_path(e, destination))?;

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| CivitError::Network {
                message: format!("Download stream error: {}", e),
                source: Some(e),
            })?;
            file.write_all(&chunk)
                .await
                .map_err(|e| CivitError::io_with_path(e, destination))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| CivitError::io_with_path(e, destination))?;

        debug!("Downloaded {} bytes from {}", written, url);
        Ok(written)
    }
}
