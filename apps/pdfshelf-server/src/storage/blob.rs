//! Vercel Blob storage
//!
//! The metadata document lives at `metadata/metadata.json` as a public JSON
//! blob. `BlobClient` is also used on its own to upload and delete PDFs.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::http::{client, decode_document, read_json};
use super::provider::MetadataProvider;
use super::types::{SaveReceipt, Timeouts};
use crate::config::{BlobConfig, StorageProvider};
use crate::error::ProviderError;
use crate::library::{now_millis, MetadataDocument};

const API_VERSION: &str = "7";
const METADATA_PREFIX: &str = "metadata/";
const METADATA_PATHNAME: &str = "metadata/metadata.json";
const LIST_LIMIT: u32 = 10;

/// One entry of a blob listing
#[derive(Debug, Clone, Deserialize)]
pub struct BlobEntry {
    pub url: String,
    pub pathname: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    blobs: Vec<BlobEntry>,
}

/// Thin client over the Vercel Blob REST API
#[derive(Clone)]
pub struct BlobClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl BlobClient {
    /// `None` when no read-write token is configured
    pub fn from_config(config: &BlobConfig) -> Option<Self> {
        let token = config.token.clone()?;
        Some(Self {
            http: client(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("x-api-version", API_VERSION)
    }

    /// List blobs whose pathname starts with `prefix`
    pub async fn list(&self, prefix: &str, limit: u32) -> Result<Vec<BlobEntry>, ProviderError> {
        let limit = limit.to_string();
        let request = self
            .http
            .get(&self.api_url)
            .query(&[("prefix", prefix), ("limit", limit.as_str())]);

        let body = read_json(self.authorized(request).send().await?).await?;
        let listing: ListResponse = serde_json::from_value(body)
            .map_err(|e| ProviderError::Malformed(format!("invalid blob listing: {}", e)))?;
        Ok(listing.blobs)
    }

    /// Upload `body` under a fixed pathname, overwriting any previous blob
    pub async fn put(
        &self,
        pathname: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<BlobEntry, ProviderError> {
        let url = format!("{}/{}", self.api_url, pathname);
        let request = self
            .http
            .put(&url)
            .header("x-content-type", content_type)
            .header("x-add-random-suffix", "0")
            .header("x-allow-overwrite", "1")
            .body(body);

        let body = read_json(self.authorized(request).send().await?).await?;
        serde_json::from_value(body)
            .map_err(|e| ProviderError::Malformed(format!("invalid blob upload reply: {}", e)))
    }

    /// Delete blobs by URL
    pub async fn delete(&self, urls: &[&str]) -> Result<(), ProviderError> {
        let url = format!("{}/delete", self.api_url);
        let request = self.http.post(&url).json(&json!({ "urls": urls }));

        let response = self.authorized(request).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }
        Ok(())
    }

    /// Download a public blob
    pub async fn download(&self, url: &str) -> Result<reqwest::Response, ProviderError> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }
        Ok(response)
    }
}

/// Metadata stored as a JSON blob
pub struct BlobProvider {
    client: Option<BlobClient>,
}

impl BlobProvider {
    pub fn new(config: &BlobConfig) -> Self {
        Self {
            client: BlobClient::from_config(config),
        }
    }

    fn client(&self) -> Result<&BlobClient, ProviderError> {
        self.client
            .as_ref()
            .ok_or_else(|| ProviderError::NotConfigured("Vercel Blob".to_string()))
    }
}

#[async_trait]
impl MetadataProvider for BlobProvider {
    fn kind(&self) -> StorageProvider {
        StorageProvider::VercelBlob
    }

    fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::from_secs(10, 10)
    }

    async fn fetch(&self) -> Result<Option<MetadataDocument>, ProviderError> {
        let client = self.client()?;

        let blobs = client.list(METADATA_PREFIX, LIST_LIMIT).await?;
        let Some(entry) = blobs.into_iter().find(|b| b.pathname == METADATA_PATHNAME) else {
            tracing::debug!("No metadata blob found");
            return Ok(None);
        };

        let response = client.download(&entry.url).await?;
        let doc = decode_document(read_json(response).await?)?;
        Ok(Some(doc))
    }

    async fn store(&self, doc: &MetadataDocument) -> Result<SaveReceipt, ProviderError> {
        let client = self.client()?;

        let body = serde_json::to_vec_pretty(doc)
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let entry = client
            .put(METADATA_PATHNAME, body, "application/json")
            .await?;

        tracing::debug!("Metadata blob stored at {}", entry.url);
        Ok(SaveReceipt::stored(doc.last_sync.unwrap_or_else(now_millis)).with_url(entry.url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_blob_does_no_io() {
        let provider = BlobProvider::new(&BlobConfig {
            token: None,
            api_url: "http://127.0.0.1:9".to_string(),
        });

        assert!(!provider.is_configured());
        assert!(matches!(
            provider.fetch().await,
            Err(ProviderError::NotConfigured(_))
        ));
        assert!(matches!(
            provider.store(&MetadataDocument::empty()).await,
            Err(ProviderError::NotConfigured(_))
        ));
    }
}
