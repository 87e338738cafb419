//! File API routes

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::library::FileRecord;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    #[serde(default)]
    pub catalog: Option<String>,
}

/// Create the files router
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(list_files).post(upload_file))
        .route("/:id", delete(delete_file))
        .route("/:id/catalog", put(assign_catalog))
        .route("/:id/content", get(file_content))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<FileRecord>>> {
    Ok(Json(state.library().list_files().await?))
}

/// Upload a PDF (`file` field, optional `catalog` field)
async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FileRecord>)> {
    let mut upload = None;
    let mut catalog = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "document.pdf".to_string());
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file data: {}", e)))?;

                tracing::debug!("Received {} ({} bytes, {})", filename, data.len(), content_type);
                upload = Some((filename, content_type, data.to_vec()));
            }
            "catalog" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read catalog: {}", e)))?;
                catalog = Some(text);
            }
            other => tracing::debug!("Ignoring multipart field '{}'", other),
        }
    }

    let (filename, content_type, data) =
        upload.ok_or_else(|| AppError::BadRequest("No file provided. Use field name 'file'".to_string()))?;

    let record = state
        .library()
        .add_file(&filename, &content_type, data, catalog)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn assign_catalog(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AssignRequest>,
) -> Result<Json<FileRecord>> {
    Ok(Json(state.library().assign_catalog(&id, req.catalog).await?))
}

async fn delete_file(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    state.library().delete_file(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Serve a file's bytes from wherever they live
async fn file_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let body = state.library().file_content(&id).await?;
    let disposition = format!(
        "inline; filename*=UTF-8''{}",
        urlencoding::encode(&body.name)
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body.bytes,
    ))
}
