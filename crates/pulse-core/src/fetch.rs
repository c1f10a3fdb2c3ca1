use crate::refresh::RefreshError;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Source of snapshot bodies. `target` is the request path, e.g.
/// `/api/data/today`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, target: &str) -> Result<Value, RefreshError>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, target: &str) -> String {
        format!("{}/{}", self.base_url, target.trim_start_matches('/'))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, target: &str) -> Result<Value, RefreshError> {
        let url = self.url_for(target);
        debug!("fetch_request: {url}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| RefreshError::Transport(err.to_string()))?;

        let status = response.status();
        debug!("fetch_response: {url} status={}", status.as_u16());
        if !status.is_success() {
            return Err(RefreshError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| RefreshError::Body(err.to_string()))
    }
}
