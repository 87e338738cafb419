//! Metadata proxy endpoints
//!
//! Reads and writes the cloud document on the active provider directly,
//! without touching the local cache. Provider errors surface here as
//! `{error, details}` envelopes instead of being absorbed.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::{AppError, Result};
use crate::library::{Catalog, FileRecord};
use crate::state::AppState;
use crate::storage::SaveReceipt;

/// Create the metadata router
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(load_metadata).post(save_metadata))
}

/// GET /api/metadata
async fn load_metadata(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let body = match state.sync().mirror().try_fetch().await? {
        Some(doc) => serde_json::to_value(doc)?,
        None => json!({ "catalogs": [], "files": [], "lastSync": null }),
    };

    Ok(([(header::CACHE_CONTROL, "no-cache")], Json(body)))
}

/// POST /api/metadata
async fn save_metadata(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<SaveReceipt>> {
    let catalogs: Vec<Catalog> = required_array(&body, "catalogs")?;
    let files: Vec<FileRecord> = required_array(&body, "files")?;

    let receipt = state.sync().mirror().try_store(catalogs, files).await?;
    tracing::info!(
        "Metadata saved to {} (lastSync {})",
        state.sync().mirror().kind(),
        receipt.last_sync
    );
    Ok(Json(receipt))
}

fn required_array<T: DeserializeOwned>(body: &Value, field: &str) -> Result<Vec<T>> {
    let items = body
        .get(field)
        .filter(|v| v.is_array())
        .ok_or_else(|| AppError::BadRequest(format!("Invalid metadata format: '{}' must be an array", field)))?;

    serde_json::from_value(items.clone())
        .map_err(|e| AppError::BadRequest(format!("Invalid {} entry: {}", field, e)))
}
