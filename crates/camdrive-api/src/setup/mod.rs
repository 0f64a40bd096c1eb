//! Application setup and initialization

pub mod routes;
pub mod server;

use crate::services::upload::PhotoUploadService;
use crate::state::AppState;
use anyhow::Result;
use camdrive_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        backend = %config.drive.backend,
        "Configuration loaded and validated successfully"
    );

    let uploads = PhotoUploadService::initialize(&config.drive).await;
    if !uploads.is_configured() {
        tracing::warn!("Google Drive is not configured; uploads will be rejected");
    }

    let state = Arc::new(AppState::new(config.clone(), uploads));
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
