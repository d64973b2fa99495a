//! HTTP catalog client.

use crate::catalog::types::{RemoteModel, RemoteVersion};
use crate::catalog::CatalogApi;
use crate::config::NetworkConfig;
use crate::error::{MirrorError, Result};
use crate::network::{fetch_to_path, ProgressFn};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Client for the CivitAI-style catalog API.
///
/// JSON endpoints go through a client with a total request deadline.
/// File downloads use a second client without one: a multi-gigabyte
/// weight file streams for far longer than any sane total timeout, so
/// the download client bounds only connection establishment and
/// per-read stalls. Aborting a healthy transfer is the cancellation
/// token's job, not the transport's.
#[derive(Debug, Clone)]
pub struct CivitaiClient {
    api_client: reqwest::Client,
    download_client: reqwest::Client,
    base_url: String,
}

impl CivitaiClient {
    /// Create a client against the default catalog endpoint.
    pub fn new() -> Result<Self> {
        Self::with_base_url(NetworkConfig::CATALOG_BASE_URL)
    }

    /// Create a client against a custom base URL (no trailing slash).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeouts(
            base_url,
            NetworkConfig::REQUEST_TIMEOUT,
            NetworkConfig::CONNECT_TIMEOUT,
            NetworkConfig::READ_TIMEOUT,
        )
    }

    fn with_timeouts(
        base_url: impl Into<String>,
        request_timeout: Duration,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self> {
        let build_error = |e: reqwest::Error| MirrorError::Network {
            message: format!("Failed to create HTTP client: {}", e),
            cause: None,
        };

        let api_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(NetworkConfig::USER_AGENT)
            .build()
            .map_err(build_error)?;

        let download_client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .user_agent(NetworkConfig::USER_AGENT)
            .build()
            .map_err(build_error)?;

        Ok(Self {
            api_client,
            download_client,
            base_url: base_url.into(),
        })
    }

    async fn get_json(&self, url: &str, api_key: Option<&str>) -> Result<reqwest::Response> {
        let mut request = self.api_client.get(url);
        if let Some(key) = api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| MirrorError::Network {
            message: format!("GET {} failed: {}", url, e),
            cause: Some(e.to_string()),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl CatalogApi for CivitaiClient {
    async fn get_model(&self, model_id: i64, api_key: Option<&str>) -> Result<RemoteModel> {
        let url = format!("{}/models/{}", self.base_url, model_id);
        debug!("Fetching model {}", model_id);
        let response = self.get_json(&url, api_key).await?;
        let model = response.json::<RemoteModel>().await?;
        Ok(model)
    }

    async fn get_version_by_hash(
        &self,
        sha256: &str,
        api_key: Option<&str>,
    ) -> Result<Option<RemoteVersion>> {
        let url = format!("{}/model-versions/by-hash/{}", self.base_url, sha256);
        debug!("Looking up version by hash {}", sha256);
        match self.get_json(&url, api_key).await {
            Ok(response) => Ok(Some(response.json::<RemoteVersion>().await?)),
            // No catalog match is an expected outcome, not a failure.
            Err(e) if e.is_http_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn fetch_file(
        &self,
        url: &str,
        dest: &Path,
        api_key: Option<&str>,
        on_progress: Option<&ProgressFn>,
    ) -> Result<u64> {
        fetch_to_path(&self.download_client, url, dest, api_key, on_progress).await
    }
}
