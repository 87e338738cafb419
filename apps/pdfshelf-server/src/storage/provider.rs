//! Metadata providers
//!
//! Defines the provider trait and picks the active implementation from
//! configuration.

use std::sync::Arc;

use async_trait::async_trait;

use super::blob::BlobProvider;
use super::github::GithubProvider;
use super::kv::KvProvider;
use super::local::LocalFileProvider;
use super::supabase::SupabaseProvider;
use super::types::{SaveReceipt, Timeouts};
use crate::config::{StorageConfig, StorageProvider};
use crate::error::ProviderError;
use crate::library::MetadataDocument;

/// A cloud backend holding the metadata document
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Which backend this is
    fn kind(&self) -> StorageProvider;

    /// Whether the required credentials are present
    fn is_configured(&self) -> bool;

    /// Load and save bounds for this backend
    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    /// Fetch the stored document. `Ok(None)` means nothing is stored yet.
    async fn fetch(&self) -> Result<Option<MetadataDocument>, ProviderError>;

    /// Overwrite the stored document
    async fn store(&self, doc: &MetadataDocument) -> Result<SaveReceipt, ProviderError>;
}

/// Build the provider selected by `METADATA_STORAGE`
pub fn build_provider(config: &StorageConfig) -> Arc<dyn MetadataProvider> {
    match config.provider {
        StorageProvider::VercelBlob => Arc::new(BlobProvider::new(&config.blob)),
        StorageProvider::VercelKv => Arc::new(KvProvider::new(&config.kv)),
        StorageProvider::Supabase => Arc::new(SupabaseProvider::new(&config.supabase)),
        StorageProvider::Github => Arc::new(GithubProvider::new(&config.github)),
        StorageProvider::Local => Arc::new(LocalFileProvider::new(&config.local.path)),
    }
}

/// In-memory provider for tests
#[cfg(test)]
pub struct MockProvider {
    stored: std::sync::Mutex<Option<MetadataDocument>>,
    fail: bool,
    delay: std::time::Duration,
    receipt_last_sync: Option<i64>,
    first_store_delay: std::time::Duration,
    store_calls: std::sync::atomic::AtomicUsize,
    stores: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockProvider {
    pub fn new(stored: Option<MetadataDocument>) -> Self {
        Self {
            stored: std::sync::Mutex::new(stored),
            fail: false,
            delay: std::time::Duration::ZERO,
            receipt_last_sync: None,
            first_store_delay: std::time::Duration::ZERO,
            store_calls: std::sync::atomic::AtomicUsize::new(0),
            stores: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// A provider whose every call fails upstream
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(None)
        }
    }

    /// A provider that answers only after `delay`
    pub fn slow(delay: std::time::Duration) -> Self {
        Self {
            delay,
            ..Self::new(None)
        }
    }

    /// A provider whose receipts report a fixed `lastSync`
    pub fn with_receipt_last_sync(mut self, last_sync: i64) -> Self {
        self.receipt_last_sync = Some(last_sync);
        self
    }

    /// Only the first `store` call waits for `delay`
    pub fn with_slow_first_store(mut self, delay: std::time::Duration) -> Self {
        self.first_store_delay = delay;
        self
    }

    pub fn stored(&self) -> Option<MetadataDocument> {
        self.stored.lock().unwrap().clone()
    }

    pub fn store_count(&self) -> usize {
        self.stores.load(std::sync::atomic::Ordering::SeqCst)
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[cfg(test)]
#[async_trait]
impl MetadataProvider for MockProvider {
    fn kind(&self) -> StorageProvider {
        StorageProvider::Local
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn fetch(&self) -> Result<Option<MetadataDocument>, ProviderError> {
        self.pause().await;
        if self.fail {
            return Err(ProviderError::Upstream {
                status: 500,
                body: "mock failure".to_string(),
            });
        }
        Ok(self.stored())
    }

    async fn store(&self, doc: &MetadataDocument) -> Result<SaveReceipt, ProviderError> {
        self.pause().await;
        let call = self
            .store_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if call == 0 && !self.first_store_delay.is_zero() {
            tokio::time::sleep(self.first_store_delay).await;
        }
        if self.fail {
            return Err(ProviderError::Upstream {
                status: 500,
                body: "mock failure".to_string(),
            });
        }
        self.stores.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        *self.stored.lock().unwrap() = Some(doc.clone());
        let last_sync = self
            .receipt_last_sync
            .or(doc.last_sync)
            .unwrap_or_default();
        Ok(SaveReceipt::stored(last_sync))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_build_selects_configured_kind() {
        let mut config = Config::default().storage;
        for kind in [
            StorageProvider::VercelBlob,
            StorageProvider::VercelKv,
            StorageProvider::Supabase,
            StorageProvider::Github,
            StorageProvider::Local,
        ] {
            config.provider = kind;
            assert_eq!(build_provider(&config).kind(), kind);
        }
    }

    #[test]
    fn test_only_local_is_configured_by_default() {
        let mut config = Config::default().storage;
        config.provider = StorageProvider::Local;
        assert!(build_provider(&config).is_configured());

        config.provider = StorageProvider::Supabase;
        assert!(!build_provider(&config).is_configured());
    }

    #[test]
    fn test_per_provider_timeouts() {
        let mut config = Config::default().storage;
        config.provider = StorageProvider::VercelKv;
        assert_eq!(build_provider(&config).timeouts(), Timeouts::from_secs(10, 15));

        config.provider = StorageProvider::Supabase;
        assert_eq!(build_provider(&config).timeouts(), Timeouts::from_secs(10, 25));
    }
}
