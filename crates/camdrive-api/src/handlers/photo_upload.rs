use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use camdrive_core::models::{UploadRequest, UploadWarning};
use camdrive_core::AppError;
use serde::Serialize;

use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUploadResponse {
    pub message: &'static str,
    pub file_id: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_for: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_to_account: Option<String>,
    pub warnings: Vec<UploadWarning>,
}

/// Fields of the upload form
#[derive(Debug, Default)]
struct PhotoForm {
    content: Vec<u8>,
    content_type: Option<String>,
    user_name: Option<String>,
    user_email: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Read `file`, `userName` and `userEmail`; other fields are ignored.
async fn read_form(mut multipart: Multipart) -> Result<PhotoForm, HttpAppError> {
    let mut form = PhotoForm::default();
    let mut seen_file = false;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                if seen_file {
                    return Err(AppError::InvalidInput(
                        "Multiple file fields are not allowed; send exactly one field named 'file'"
                            .to_string(),
                    )
                    .into());
                }
                seen_file = true;
                form.content_type = field.content_type().map(String::from);
                form.content = field.bytes().await?.to_vec();
            }
            "userName" => form.user_name = Some(field.text().await?),
            "userEmail" => form.user_email = Some(field.text().await?),
            _ => {}
        }
    }

    Ok(form)
}

/// Upload a camera photo to Google Drive
///
/// Accepts `multipart/form-data` with a `file` part and optional `userName`
/// and `userEmail` text parts.
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_photo"))]
pub async fn upload_photo(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<PhotoUploadResponse>, HttpAppError> {
    let form = read_form(multipart).await?;

    let max_size = state.config.max_file_size_bytes();
    if form.content.len() > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File size exceeds maximum allowed size of {} MB",
            max_size / 1024 / 1024
        ))
        .into());
    }

    let uploaded_for = non_blank(form.user_name.as_deref());
    let uploaded_to_account = non_blank(form.user_email.as_deref());

    let request = UploadRequest::new(form.content, form.content_type.unwrap_or_default())
        .with_display_name(form.user_name)
        .with_target_account(form.user_email);

    let outcome = state.uploads.upload_photo(request).await?;

    for warning in &outcome.warnings {
        tracing::warn!(file_id = %outcome.file_id, reason = %warning.reason(), "Upload degraded");
    }

    Ok(Json(PhotoUploadResponse {
        message: "Photo uploaded successfully to Google Drive",
        file_id: outcome.file_id,
        file_name: outcome.file_name,
        folder_id: outcome.folder_id,
        uploaded_for,
        uploaded_to_account,
        warnings: outcome.warnings,
    }))
}
