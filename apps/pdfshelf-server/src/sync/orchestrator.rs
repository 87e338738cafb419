//! Background pull and push of the metadata document

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use super::mirror::CloudMirror;
use super::reconcile::{reconcile, ReconcileReport};
use crate::db::LocalCache;
use crate::error::{AppError, Result};
use crate::library::now_millis;
use crate::storage::SaveReceipt;

/// Result of one pull
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SyncOutcome {
    /// The cloud had nothing, or could not be reached
    NoData,
    Reconciled(ReconcileReport),
    Failed { error: String },
}

/// Last observed pull and push, for the status route
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub provider: String,
    pub configured: bool,
    pub last_pull_at: Option<i64>,
    pub last_pull: Option<SyncOutcome>,
    pub last_push_at: Option<i64>,
    pub last_push: Option<SaveReceipt>,
    pub push_failures: u64,
}

pub struct SyncOrchestrator {
    cache: Arc<dyn LocalCache>,
    mirror: Arc<CloudMirror>,
    status: RwLock<SyncStatus>,
    /// Held from snapshot read to save so pushes land in mutation order
    push_lock: Mutex<()>,
}

impl SyncOrchestrator {
    pub fn new(cache: Arc<dyn LocalCache>, mirror: CloudMirror) -> Self {
        let status = SyncStatus {
            provider: mirror.kind().to_string(),
            configured: mirror.is_configured(),
            ..SyncStatus::default()
        };

        Self {
            cache,
            mirror: Arc::new(mirror),
            status: RwLock::new(status),
            push_lock: Mutex::new(()),
        }
    }

    pub fn mirror(&self) -> &CloudMirror {
        &self.mirror
    }

    pub async fn status(&self) -> SyncStatus {
        self.status.read().await.clone()
    }

    /// Merge a document into the cache
    pub async fn reconcile(&self, doc: &crate::library::MetadataDocument) -> Result<ReconcileReport> {
        reconcile(self.cache.as_ref(), doc).await
    }

    /// Load from the cloud and reconcile. Never fails; problems are logged.
    pub async fn pull(&self) -> SyncOutcome {
        let outcome = match self.mirror.load().await {
            Some(doc) if !doc.is_empty() => match self.reconcile(&doc).await {
                Ok(report) => {
                    tracing::info!(
                        "Synced from {}: {} catalogs, {} files updated, {} inserted",
                        self.mirror.kind(),
                        report.catalogs_replaced,
                        report.files_updated,
                        report.files_inserted
                    );
                    SyncOutcome::Reconciled(report)
                }
                Err(e) => {
                    tracing::error!("Reconciliation failed: {}", e);
                    SyncOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            },
            _ => SyncOutcome::NoData,
        };

        let mut status = self.status.write().await;
        status.last_pull_at = Some(now_millis());
        status.last_pull = Some(outcome.clone());
        outcome
    }

    /// Deferred pull run once after startup
    pub fn spawn_initial_sync(self: &Arc<Self>, delay: Duration) -> JoinHandle<SyncOutcome> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.pull().await
        })
    }

    /// Manual sync: pull and report what happened
    pub async fn sync_now(&self) -> Result<SyncOutcome> {
        match self.pull().await {
            SyncOutcome::NoData => Err(AppError::NotFound(
                "No metadata found in cloud storage".to_string(),
            )),
            SyncOutcome::Failed { error } => Err(AppError::Internal(error)),
            outcome => Ok(outcome),
        }
    }

    /// Save the current cache contents to the cloud.
    ///
    /// Pushes run one at a time, each reading the cache only once the
    /// previous save has finished, so an older snapshot never lands last.
    pub async fn push_snapshot(&self) -> Option<SaveReceipt> {
        let _guard = self.push_lock.lock().await;

        let snapshot = futures::try_join!(self.cache.list_catalogs(), self.cache.list_files());
        let (catalogs, files) = match snapshot {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!("Failed to read cache for push: {}", e);
                return None;
            }
        };

        let receipt = self.mirror.save(catalogs, files).await;

        let mut status = self.status.write().await;
        status.last_push_at = Some(now_millis());
        match &receipt {
            Some(r) => status.last_push = Some(r.clone()),
            None => status.push_failures += 1,
        }
        receipt
    }

    /// Fire-and-forget push after a library mutation
    pub fn push_in_background(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Some(receipt) = this.push_snapshot().await {
                tracing::debug!("Background push stored lastSync {}", receipt.last_sync);
            }
        });
    }
}
