//! GitHub contents API storage
//!
//! The document is committed to a repository file; every save is a commit.

use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use serde_json::{json, Value};

use super::http::{client, decode_document, parse_json, read_json};
use super::provider::MetadataProvider;
use super::types::{SaveReceipt, Timeouts};
use crate::config::{GithubConfig, StorageProvider};
use crate::error::ProviderError;
use crate::library::{now_millis, MetadataDocument};

struct Repository {
    token: String,
    contents_url: String,
}

/// Metadata committed to a GitHub repository
pub struct GithubProvider {
    http: reqwest::Client,
    repo: Option<Repository>,
}

impl GithubProvider {
    pub fn new(config: &GithubConfig) -> Self {
        let repo = match (&config.token, &config.owner, &config.repo) {
            (Some(token), Some(owner), Some(repo)) => Some(Repository {
                token: token.clone(),
                contents_url: format!(
                    "{}/repos/{}/{}/contents/{}",
                    config.api_url.trim_end_matches('/'),
                    owner,
                    repo,
                    config.path.trim_start_matches('/')
                ),
            }),
            _ => None,
        };

        Self { http: client(), repo }
    }

    fn repo(&self) -> Result<&Repository, ProviderError> {
        self.repo
            .as_ref()
            .ok_or_else(|| ProviderError::NotConfigured("GitHub".to_string()))
    }

    fn request(&self, repo: &Repository, method: reqwest::Method) -> reqwest::RequestBuilder {
        self.http
            .request(method, &repo.contents_url)
            .header("Authorization", format!("token {}", repo.token))
            .header("Accept", "application/vnd.github.v3+json")
    }

    /// Current file entry, or `None` when the file does not exist yet
    async fn contents(&self, repo: &Repository) -> Result<Option<Value>, ProviderError> {
        let response = self.request(repo, reqwest::Method::GET).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read_json(response).await.map(Some)
    }
}

/// Decode the base64 `content` field of a contents API entry.
///
/// GitHub wraps the encoding at 60 columns.
pub fn decode_contents(entry: &Value) -> Result<MetadataDocument, ProviderError> {
    let encoded = entry
        .get("content")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::Malformed("contents entry has no content".to_string()))?;

    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| ProviderError::Malformed(format!("invalid base64: {}", e)))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| ProviderError::Malformed(format!("invalid UTF-8: {}", e)))?;

    decode_document(parse_json(&text)?)
}

#[async_trait]
impl MetadataProvider for GithubProvider {
    fn kind(&self) -> StorageProvider {
        StorageProvider::Github
    }

    fn is_configured(&self) -> bool {
        self.repo.is_some()
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::from_secs(10, 10)
    }

    async fn fetch(&self) -> Result<Option<MetadataDocument>, ProviderError> {
        let repo = self.repo()?;

        match self.contents(repo).await? {
            Some(entry) => decode_contents(&entry).map(Some),
            None => Ok(None),
        }
    }

    async fn store(&self, doc: &MetadataDocument) -> Result<SaveReceipt, ProviderError> {
        let repo = self.repo()?;

        // An update must carry the blob sha of the version it replaces
        let sha = match self.contents(repo).await {
            Ok(entry) => entry.and_then(|e| e.get("sha").and_then(Value::as_str).map(str::to_string)),
            Err(e) => {
                tracing::warn!("Could not read current metadata sha: {}", e);
                None
            }
        };

        let text = serde_json::to_string_pretty(doc)
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let mut body = json!({
            "message": format!("Update metadata - {}", Utc::now().to_rfc3339()),
            "content": base64::engine::general_purpose::STANDARD.encode(text),
        });
        if let Some(sha) = sha {
            body["sha"] = Value::String(sha);
        }

        let response = self
            .request(repo, reqwest::Method::PUT)
            .json(&body)
            .send()
            .await?;
        let reply = read_json(response).await?;

        let mut receipt = SaveReceipt::stored(doc.last_sync.unwrap_or_else(now_millis));
        if let Some(url) = reply.pointer("/content/html_url").and_then(Value::as_str) {
            receipt = receipt.with_url(url);
        }
        Ok(receipt)
    }
}
