//! HTTP helpers for the REST-backed providers

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use crate::error::ProviderError;
use crate::library::MetadataDocument;

/// Build the shared client used by a provider
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("pdfshelf-server/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        })
}

/// Read a JSON body, rejecting error statuses and HTML pages.
///
/// A 200 HTML page (a misrouted request on a hosted platform) is malformed.
pub async fn read_json(response: reqwest::Response) -> Result<Value, ProviderError> {
    if !response.status().is_success() {
        return Err(ProviderError::from_response(response).await);
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if content_type.contains("text/html") {
        return Err(ProviderError::Malformed(format!(
            "expected JSON, got {}",
            content_type
        )));
    }

    let text = response.text().await?;
    parse_json(&text)
}

pub fn parse_json(text: &str) -> Result<Value, ProviderError> {
    serde_json::from_str(text)
        .map_err(|e| ProviderError::Malformed(format!("invalid JSON: {}", e)))
}

/// Decode a metadata document, requiring both arrays
pub fn decode_document(value: Value) -> Result<MetadataDocument, ProviderError> {
    serde_json::from_value(value)
        .map_err(|e| ProviderError::Malformed(format!("not a metadata document: {}", e)))
}

/// Decode a value that may hold the document inline or as a JSON string
pub fn decode_embedded(value: Value) -> Result<Option<MetadataDocument>, ProviderError> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => decode_document(parse_json(&text)?).map(Some),
        Value::Object(_) => decode_document(value).map(Some),
        other => Err(ProviderError::Malformed(format!(
            "unexpected stored value: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_embedded_string() {
        let value = json!(r#"{"catalogs":[],"files":[{"id":"a","name":"a.pdf"}],"lastSync":5}"#);
        let doc = decode_embedded(value).unwrap().unwrap();
        assert_eq!(doc.files.len(), 1);
        assert_eq!(doc.last_sync, Some(5));
    }

    #[test]
    fn test_decode_embedded_null_is_absent() {
        assert!(decode_embedded(Value::Null).unwrap().is_none());
    }

    #[test]
    fn test_decode_embedded_rejects_garbage() {
        assert!(matches!(
            decode_embedded(json!("not json")),
            Err(ProviderError::Malformed(_))
        ));
        assert!(matches!(
            decode_embedded(json!(42)),
            Err(ProviderError::Malformed(_))
        ));
        assert!(matches!(
            decode_embedded(json!({"catalogs": []})),
            Err(ProviderError::Malformed(_))
        ));
    }
}
