use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use camdrive_core::models::FileInfo;

use crate::error::HttpAppError;
use crate::state::AppState;

/// Metadata of an uploaded file
#[tracing::instrument(skip(state), fields(operation = "file_info"))]
pub async fn get_file_info(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<Json<FileInfo>, HttpAppError> {
    let info = state.uploads.file_info(&file_id).await?;
    Ok(Json(info))
}
