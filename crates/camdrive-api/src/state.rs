//! Application state shared with handlers.

use crate::services::upload::PhotoUploadService;
use camdrive_core::Config;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub uploads: Arc<PhotoUploadService>,
}

impl AppState {
    pub fn new(config: Config, uploads: PhotoUploadService) -> Self {
        Self {
            config,
            uploads: Arc::new(uploads),
        }
    }
}
