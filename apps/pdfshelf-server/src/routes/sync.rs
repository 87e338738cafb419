//! Sync API endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::SaveReceipt;
use crate::sync::{SyncOutcome, SyncStatus};

/// Create the sync router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(sync_now))
        .route("/push", post(push))
        .route("/status", get(status))
}

/// Pull from the cloud and reconcile now
async fn sync_now(State(state): State<AppState>) -> Result<Json<SyncOutcome>> {
    let outcome = state.sync().sync_now().await?;
    Ok(Json(outcome))
}

/// Push the local cache to the cloud now
async fn push(State(state): State<AppState>) -> Result<Json<SaveReceipt>> {
    state
        .sync()
        .push_snapshot()
        .await
        .map(Json)
        .ok_or_else(|| AppError::Internal("Cloud save failed".to_string()))
}

async fn status(State(state): State<AppState>) -> Json<SyncStatus> {
    Json(state.sync().status().await)
}
