//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::db::LocalCache;
use crate::library::{Library, RemoteTimeouts};
use crate::storage::{BlobClient, MetadataProvider};
use crate::sync::{CloudMirror, SyncOrchestrator};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    library: Library,
    sync: Arc<SyncOrchestrator>,
}

impl AppState {
    /// Wire the cache and the active provider together
    pub fn new(config: Config, cache: Arc<dyn LocalCache>, provider: Arc<dyn MetadataProvider>) -> Self {
        Self::with_mirror(config, cache, CloudMirror::new(provider))
    }

    /// Same as `new`, with a preconfigured mirror
    pub fn with_mirror(config: Config, cache: Arc<dyn LocalCache>, mirror: CloudMirror) -> Self {
        let sync = Arc::new(SyncOrchestrator::new(cache.clone(), mirror));
        let blob = BlobClient::from_config(&config.storage.blob);
        let library = Library::new(cache, sync.clone(), blob)
            .with_timeouts(RemoteTimeouts::from(&config.upload));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                library,
                sync,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the library service
    pub fn library(&self) -> &Library {
        &self.inner.library
    }

    /// Get the sync orchestrator
    pub fn sync(&self) -> &Arc<SyncOrchestrator> {
        &self.inner.sync
    }
}
