//! Catalog API routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::library::{suggest_catalog, Catalog};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CatalogRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub catalog: String,
}

/// Create the catalogs router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_catalogs).post(create_catalog))
        .route("/order", put(reorder_catalogs))
        .route("/suggest", get(suggest))
        .route("/:id", put(rename_catalog).delete(delete_catalog))
}

async fn list_catalogs(State(state): State<AppState>) -> Result<Json<Vec<Catalog>>> {
    Ok(Json(state.library().list_catalogs().await?))
}

async fn create_catalog(
    State(state): State<AppState>,
    Json(req): Json<CatalogRequest>,
) -> Result<(StatusCode, Json<Catalog>)> {
    let catalog = state
        .library()
        .create_catalog(&req.name, req.description.as_deref().unwrap_or(""))
        .await?;
    Ok((StatusCode::CREATED, Json(catalog)))
}

async fn rename_catalog(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CatalogRequest>,
) -> Result<Json<Catalog>> {
    let catalog = state
        .library()
        .rename_catalog(&id, &req.name, req.description.as_deref())
        .await?;
    Ok(Json(catalog))
}

async fn reorder_catalogs(
    State(state): State<AppState>,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<Vec<Catalog>>> {
    Ok(Json(state.library().reorder_catalogs(&req.ids).await?))
}

async fn delete_catalog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.library().delete_catalog(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Suggest a catalog for a file name
async fn suggest(Query(query): Query<SuggestQuery>) -> Json<SuggestResponse> {
    Json(SuggestResponse {
        catalog: suggest_catalog(&query.name),
    })
}
