//! Metadata synchronization between the local cache and the cloud

mod mirror;
mod orchestrator;
mod reconcile;

pub use mirror::CloudMirror;
pub use orchestrator::{SyncOrchestrator, SyncOutcome, SyncStatus};
pub use reconcile::{reconcile, ReconcileReport};
