//! Library management
//!
//! Catalogs and files as the user sees them. Every mutation lands in the
//! local cache first and is then pushed to the cloud in the background.

mod catalogs;
mod files;
mod suggest;
mod types;

use std::sync::Arc;
use std::time::Duration;

pub use files::FileBody;
pub use suggest::suggest_catalog;
pub use types::*;

use crate::config::UploadConfig;
use crate::db::LocalCache;
use crate::storage::{http_client, BlobClient};
use crate::sync::SyncOrchestrator;

/// Bounds on calls that move PDF content over the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteTimeouts {
    /// Blob upload and remote content download
    pub transfer: Duration,
    /// Best-effort blob removal
    pub delete: Duration,
}

impl Default for RemoteTimeouts {
    fn default() -> Self {
        Self {
            transfer: Duration::from_secs(55),
            delete: Duration::from_secs(10),
        }
    }
}

impl From<&UploadConfig> for RemoteTimeouts {
    fn from(config: &UploadConfig) -> Self {
        Self {
            transfer: Duration::from_millis(config.transfer_timeout_ms),
            delete: Duration::from_millis(config.delete_timeout_ms),
        }
    }
}

/// Library service shared by the HTTP handlers
#[derive(Clone)]
pub struct Library {
    cache: Arc<dyn LocalCache>,
    sync: Arc<SyncOrchestrator>,
    blob: Option<BlobClient>,
    http: reqwest::Client,
    timeouts: RemoteTimeouts,
}

impl Library {
    pub fn new(
        cache: Arc<dyn LocalCache>,
        sync: Arc<SyncOrchestrator>,
        blob: Option<BlobClient>,
    ) -> Self {
        Self {
            cache,
            sync,
            blob,
            http: http_client(),
            timeouts: RemoteTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: RemoteTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    fn changed(&self) {
        self.sync.push_in_background();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::db::SqliteCache;
    use crate::storage::MockProvider;
    use crate::sync::CloudMirror;

    /// A library over an in-memory cache and mock provider
    pub async fn library() -> (Library, Arc<SqliteCache>, Arc<MockProvider>) {
        library_with_blob(None).await
    }

    /// Same as `library`, with a blob client for file content
    pub async fn library_with_blob(
        blob: Option<BlobClient>,
    ) -> (Library, Arc<SqliteCache>, Arc<MockProvider>) {
        let cache = Arc::new(SqliteCache::in_memory().await.unwrap());
        let provider = Arc::new(MockProvider::new(None));
        let sync = Arc::new(SyncOrchestrator::new(
            cache.clone(),
            CloudMirror::new(provider.clone()),
        ));
        (Library::new(cache.clone(), sync, blob), cache, provider)
    }
}
