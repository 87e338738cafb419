//! Upstash Redis (Vercel KV) over its REST API

use async_trait::async_trait;
use serde_json::Value;

use super::http::{client, decode_embedded, read_json};
use super::provider::MetadataProvider;
use super::types::{SaveReceipt, Timeouts};
use crate::config::{KvConfig, StorageProvider};
use crate::error::ProviderError;
use crate::library::{now_millis, MetadataDocument};

const METADATA_KEY: &str = "pdf-metadata";

struct Endpoint {
    url: String,
    token: String,
}

/// Metadata stored under a single KV key
pub struct KvProvider {
    http: reqwest::Client,
    endpoint: Option<Endpoint>,
}

impl KvProvider {
    pub fn new(config: &KvConfig) -> Self {
        let endpoint = match (&config.rest_url, &config.rest_token) {
            (Some(url), Some(token)) => Some(Endpoint {
                url: url.trim_end_matches('/').to_string(),
                token: token.clone(),
            }),
            _ => None,
        };

        Self {
            http: client(),
            endpoint,
        }
    }

    fn endpoint(&self) -> Result<&Endpoint, ProviderError> {
        self.endpoint
            .as_ref()
            .ok_or_else(|| ProviderError::NotConfigured("Vercel KV".to_string()))
    }
}

/// Decode the `result` field of a `GET` reply.
///
/// Values written by this server are JSON strings; older writers stored the
/// object directly.
pub fn decode_kv_result(body: Value) -> Result<Option<MetadataDocument>, ProviderError> {
    let Value::Object(mut fields) = body else {
        return Err(ProviderError::Malformed("KV reply is not an object".to_string()));
    };

    if let Some(error) = fields.get("error") {
        return Err(ProviderError::Malformed(format!("KV error: {}", error)));
    }

    decode_embedded(fields.remove("result").unwrap_or(Value::Null))
}

#[async_trait]
impl MetadataProvider for KvProvider {
    fn kind(&self) -> StorageProvider {
        StorageProvider::VercelKv
    }

    fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::from_secs(10, 15)
    }

    async fn fetch(&self) -> Result<Option<MetadataDocument>, ProviderError> {
        let endpoint = self.endpoint()?;

        let response = self
            .http
            .get(format!("{}/get/{}", endpoint.url, METADATA_KEY))
            .bearer_auth(&endpoint.token)
            .send()
            .await?;

        decode_kv_result(read_json(response).await?)
    }

    async fn store(&self, doc: &MetadataDocument) -> Result<SaveReceipt, ProviderError> {
        let endpoint = self.endpoint()?;

        let body = serde_json::to_string(doc).map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let response = self
            .http
            .post(format!("{}/set/{}", endpoint.url, METADATA_KEY))
            .bearer_auth(&endpoint.token)
            .body(body)
            .send()
            .await?;

        let reply = read_json(response).await?;
        if let Some(error) = reply.get("error") {
            return Err(ProviderError::Upstream {
                status: 200,
                body: error.to_string(),
            });
        }

        Ok(SaveReceipt::stored(doc.last_sync.unwrap_or_else(now_millis)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_as_string() {
        let body = json!({"result": "{\"catalogs\":[{\"id\":\"c\",\"name\":\"Work\"}],\"files\":[]}"});
        let doc = decode_kv_result(body).unwrap().unwrap();
        assert_eq!(doc.catalogs[0].name, "Work");
    }

    #[test]
    fn test_result_as_object() {
        let body = json!({"result": {"catalogs": [], "files": [], "lastSync": 7}});
        let doc = decode_kv_result(body).unwrap().unwrap();
        assert_eq!(doc.last_sync, Some(7));
    }

    #[test]
    fn test_missing_key_is_absent() {
        assert!(decode_kv_result(json!({"result": null})).unwrap().is_none());
    }

    #[test]
    fn test_malformed_result() {
        assert!(decode_kv_result(json!({"result": "{oops"})).is_err());
        assert!(decode_kv_result(json!({"error": "WRONGPASS"})).is_err());
        assert!(decode_kv_result(json!([1, 2])).is_err());
    }

    #[test]
    fn test_requires_url_and_token() {
        let provider = KvProvider::new(&KvConfig {
            rest_url: Some("https://kv.example".to_string()),
            rest_token: None,
        });
        assert!(!provider.is_configured());
    }
}
