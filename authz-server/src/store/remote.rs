use super::{BackingStore, StoreEntry, StoreError};
use async_trait::async_trait;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};
use log::{debug, error};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Document store reached over HTTP: `GET {base}/entries/{id}`, 404 = absent
#[derive(Clone)]
pub struct HttpStore {
    client: Client,
    base_url: Url,
}

impl HttpStore {
    pub fn new(base_url: &str, api_key: Option<&str>, timeout_secs: u64) -> Result<Self, StoreError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| StoreError::Config(format!("Invalid store URL '{}': {}", base_url, e)))?;
        // Url::join drops the last segment unless the path ends with a slash
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(api_key) = api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| StoreError::Config(format!("Invalid store API key: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(2)))
            .default_headers(headers)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()?;

        Ok(Self { client, base_url })
    }

    fn entry_url(&self, id: &str) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Config("Store URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push("entries")
            .push(id);
        Ok(url)
    }
}

#[async_trait]
impl BackingStore for HttpStore {
    async fn get_entry(&self, id: &str) -> Result<Option<StoreEntry>, StoreError> {
        let url = self.entry_url(id)?;
        debug!("Fetching store entry from {}", url);

        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            error!("Store returned {} for entry {}", status, id);
            return Err(StoreError::InvalidStatus(status));
        }

        let body = response.bytes().await?;
        Ok(Some(serde_json::from_slice(&body)?))
    }

    async fn health_check(&self) -> Result<(), String> {
        let url = self
            .base_url
            .join("health")
            .map_err(|e| format!("Invalid store health URL: {}", e))?;
        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => Err(format!("Store health check returned {}", response.status())),
            Err(err) => Err(format!("Store health check failed: {}", err)),
        }
    }
}
