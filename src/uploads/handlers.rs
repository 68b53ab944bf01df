use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use super::{
    dto::{FileListItem, UploadResponse},
    services,
};
use crate::{auth::extractors::AuthUser, error::AppError, state::AppState};

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn upload_routes(max_file_size: usize) -> Router<AppState> {
    let write = Router::new()
        .route("/upload", post(upload_csv))
        .route("/upload/", post(upload_csv))
        .layer(DefaultBodyLimit::max(body_limit(max_file_size)));

    Router::new()
        .merge(write)
        .route("/upload/files", get(list_files))
        .route("/upload/files/:id", get(get_file))
}

fn body_limit(max_file_size: usize) -> usize {
    max_file_size.saturating_add(MULTIPART_OVERHEAD)
}

/// POST /upload (multipart, field `file`)
#[instrument(skip(state, mp))]
pub async fn upload_csv(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let max = state.config.max_file_size;

    while let Some(field) = mp.next_field().await.map_err(|e| multipart_error(e, max))? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        // reject by name before reading the body
        services::check_upload(&filename, 0, max)?;
        let data = field.bytes().await.map_err(|e| multipart_error(e, max))?;
        services::check_upload(&filename, data.len(), max)?;

        let stored = services::store(&state, user_id, &filename, data).await?;
        return Ok(Json(stored.into()));
    }

    Err(AppError::InvalidInput("file is required".into()))
}

fn multipart_error(e: MultipartError, max: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { limit: max }
    } else {
        warn!(error = %e, "bad multipart body");
        AppError::InvalidInput(e.body_text())
    }
}

#[instrument(skip(state))]
pub async fn list_files(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<FileListItem>>, AppError> {
    let files = services::list_for(&state, user_id).await?;
    Ok(Json(files.into_iter().map(FileListItem::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_file(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FileListItem>, AppError> {
    let file = services::get_by_raw_id(&state, user_id, &id).await?;
    Ok(Json(file.into()))
}
