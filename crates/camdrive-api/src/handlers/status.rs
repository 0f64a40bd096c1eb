use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveStatusResponse {
    pub configured: bool,
    pub folder_id: String,
    pub service: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpersonationStatusResponse {
    pub impersonation_enabled: bool,
    pub domain: Option<String>,
    pub default_user: Option<String>,
    pub configured: bool,
}

pub async fn drive_status(State(state): State<Arc<AppState>>) -> Json<DriveStatusResponse> {
    let status = state.uploads.status();
    Json(DriveStatusResponse {
        configured: status.configured,
        folder_id: status.root_folder_id,
        service: "Google Drive",
    })
}

pub async fn impersonation_status(
    State(state): State<Arc<AppState>>,
) -> Json<ImpersonationStatusResponse> {
    let status = state.uploads.status();
    Json(ImpersonationStatusResponse {
        impersonation_enabled: status.impersonation_enabled,
        domain: status.domain,
        default_user: status.default_account,
        configured: status.configured,
    })
}
