//! Supabase (PostgREST) table storage
//!
//! One row in the `metadata` table keyed `pdf-metadata`; its `value` column
//! holds the document.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use super::http::{client, decode_embedded, read_json};
use super::provider::MetadataProvider;
use super::types::{SaveReceipt, Timeouts};
use crate::config::{StorageProvider, SupabaseConfig};
use crate::error::ProviderError;
use crate::library::{now_millis, MetadataDocument};

const TABLE: &str = "metadata";
const METADATA_KEY: &str = "pdf-metadata";

struct Project {
    url: String,
    key: String,
}

/// Metadata stored as a Supabase row
pub struct SupabaseProvider {
    http: reqwest::Client,
    project: Option<Project>,
}

impl SupabaseProvider {
    pub fn new(config: &SupabaseConfig) -> Self {
        let project = match (&config.url, &config.key) {
            (Some(url), Some(key)) => Some(Project {
                url: url.trim_end_matches('/').to_string(),
                key: key.clone(),
            }),
            _ => None,
        };

        Self {
            http: client(),
            project,
        }
    }

    fn project(&self) -> Result<&Project, ProviderError> {
        self.project
            .as_ref()
            .ok_or_else(|| ProviderError::NotConfigured("Supabase".to_string()))
    }

    fn request(&self, project: &Project, method: reqwest::Method, query: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}/rest/v1/{}{}", project.url, TABLE, query))
            .header("apikey", &project.key)
            .bearer_auth(&project.key)
    }
}

/// Pick the document out of a PostgREST row list
pub fn decode_rows(body: Value) -> Result<Option<MetadataDocument>, ProviderError> {
    let Value::Array(rows) = body else {
        return Err(ProviderError::Malformed("expected a row array".to_string()));
    };

    match rows.into_iter().next() {
        None => Ok(None),
        Some(Value::Object(mut row)) => decode_embedded(row.remove("value").unwrap_or(Value::Null)),
        Some(other) => Err(ProviderError::Malformed(format!("unexpected row: {}", other))),
    }
}

#[async_trait]
impl MetadataProvider for SupabaseProvider {
    fn kind(&self) -> StorageProvider {
        StorageProvider::Supabase
    }

    fn is_configured(&self) -> bool {
        self.project.is_some()
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::from_secs(10, 25)
    }

    async fn fetch(&self) -> Result<Option<MetadataDocument>, ProviderError> {
        let project = self.project()?;

        let query = format!("?key=eq.{}&select=value", METADATA_KEY);
        let response = self
            .request(project, reqwest::Method::GET, &query)
            .send()
            .await?;

        decode_rows(read_json(response).await?)
    }

    async fn store(&self, doc: &MetadataDocument) -> Result<SaveReceipt, ProviderError> {
        let project = self.project()?;
        let updated_at = Utc::now().to_rfc3339();

        let upsert = self
            .request(project, reqwest::Method::POST, "")
            .header("Prefer", "resolution=merge-duplicates")
            .json(&json!({
                "key": METADATA_KEY,
                "value": doc,
                "updated_at": updated_at,
            }))
            .send()
            .await?;

        if !upsert.status().is_success() {
            let status = upsert.status();
            tracing::warn!("Supabase upsert returned {}, falling back to update", status);

            let query = format!("?key=eq.{}", METADATA_KEY);
            let update = self
                .request(project, reqwest::Method::PATCH, &query)
                .json(&json!({
                    "value": doc,
                    "updated_at": updated_at,
                }))
                .send()
                .await?;

            if !update.status().is_success() {
                return Err(ProviderError::from_response(update).await);
            }
        }

        Ok(SaveReceipt::stored(doc.last_sync.unwrap_or_else(now_millis)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_rows_is_absent() {
        assert!(decode_rows(json!([])).unwrap().is_none());
    }

    #[test]
    fn test_first_row_value() {
        let rows = json!([{"value": {"catalogs": [], "files": [{"id": "a", "name": "a.pdf"}]}}]);
        let doc = decode_rows(rows).unwrap().unwrap();
        assert_eq!(doc.files[0].id, "a");
    }

    #[test]
    fn test_error_object_is_malformed() {
        let body = json!({"message": "relation \"metadata\" does not exist"});
        assert!(matches!(decode_rows(body), Err(ProviderError::Malformed(_))));
    }
}
