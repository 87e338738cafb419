//! JSON backup file on local disk

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::http::{decode_document, parse_json};
use super::provider::MetadataProvider;
use super::types::SaveReceipt;
use crate::config::StorageProvider;
use crate::error::ProviderError;
use crate::library::{now_millis, MetadataDocument};

/// Metadata mirrored to a file next to the server
pub struct LocalFileProvider {
    path: PathBuf,
}

impl LocalFileProvider {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MetadataProvider for LocalFileProvider {
    fn kind(&self) -> StorageProvider {
        StorageProvider::Local
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn fetch(&self) -> Result<Option<MetadataDocument>, ProviderError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        decode_document(parse_json(&text)?).map(Some)
    }

    async fn store(&self, doc: &MetadataDocument) -> Result<SaveReceipt, ProviderError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let text = serde_json::to_string_pretty(doc)
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        // Write then rename so readers never see a partial file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, text).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        Ok(SaveReceipt::stored(doc.last_sync.unwrap_or_else(now_millis)))
    }
}
