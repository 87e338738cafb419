//! Fail-soft access to the active provider
//!
//! `CloudMirror` is the only path the sync orchestrator uses to reach cloud
//! storage. Every call is time-bounded; any failure is logged and turned into
//! `None`.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tokio::time::timeout;

use crate::config::StorageProvider;
use crate::error::ProviderError;
use crate::library::{now_millis, Catalog, FileRecord, MetadataDocument};
use crate::storage::{MetadataProvider, SaveReceipt, Timeouts};

pub struct CloudMirror {
    provider: Arc<dyn MetadataProvider>,
    timeouts: Timeouts,
    /// Highest `lastSync` seen from the provider, in either direction
    last_sync: AtomicI64,
}

impl CloudMirror {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        let timeouts = provider.timeouts();
        Self {
            provider,
            timeouts,
            last_sync: AtomicI64::new(0),
        }
    }

    /// Override the provider's own bounds
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn kind(&self) -> StorageProvider {
        self.provider.kind()
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Fetch with the load timeout applied, keeping the error
    pub async fn try_fetch(&self) -> Result<Option<MetadataDocument>, ProviderError> {
        let doc = timeout(self.timeouts.load, self.provider.fetch())
            .await
            .map_err(|_| ProviderError::Timeout(self.timeouts.load))??;

        if let Some(last_sync) = doc.as_ref().and_then(|d| d.last_sync) {
            self.observe(last_sync);
        }
        Ok(doc)
    }

    /// Store a snapshot with the save timeout applied, keeping the error.
    ///
    /// The outgoing document is stamped with a `lastSync` no earlier than any
    /// value seen before, and the receipt is clamped the same way.
    pub async fn try_store(
        &self,
        catalogs: Vec<Catalog>,
        files: Vec<FileRecord>,
    ) -> Result<SaveReceipt, ProviderError> {
        let stamp = now_millis().max(self.last_sync.load(Ordering::SeqCst));
        let files = files.into_iter().map(FileRecord::without_data).collect();
        let doc = MetadataDocument::new(catalogs, files, Some(stamp)).normalized(stamp);

        let mut receipt = timeout(self.timeouts.save, self.provider.store(&doc))
            .await
            .map_err(|_| ProviderError::Timeout(self.timeouts.save))??;

        receipt.last_sync = self.observe(receipt.last_sync);
        Ok(receipt)
    }

    /// Load the cloud document. `None` on absence or any failure.
    pub async fn load(&self) -> Option<MetadataDocument> {
        match self.try_fetch().await {
            Ok(doc) => doc,
            Err(ProviderError::NotConfigured(what)) => {
                tracing::debug!("Skipping cloud load: {} is not configured", what);
                None
            }
            Err(e) => {
                tracing::warn!("Cloud load from {} failed: {}", self.kind(), e);
                None
            }
        }
    }

    /// Save a snapshot. `None` on any failure; callers do not retry.
    pub async fn save(&self, catalogs: Vec<Catalog>, files: Vec<FileRecord>) -> Option<SaveReceipt> {
        match self.try_store(catalogs, files).await {
            Ok(receipt) if receipt.success => Some(receipt),
            Ok(_) => {
                tracing::warn!("Cloud save to {} was not acknowledged", self.kind());
                None
            }
            Err(ProviderError::NotConfigured(what)) => {
                tracing::debug!("Skipping cloud save: {} is not configured", what);
                None
            }
            Err(e) => {
                tracing::warn!("Cloud save to {} failed: {}", self.kind(), e);
                None
            }
        }
    }

    /// Record `value` and return the running maximum including it
    fn observe(&self, value: i64) -> i64 {
        let previous = self.last_sync.fetch_max(value, Ordering::SeqCst);
        previous.max(value)
    }
}
