//! Types used by the photo upload service

use bytes::Bytes;
use camdrive_core::models::{Identity, NewFile, UploadWarning};
use camdrive_storage::DriveClient;
use std::sync::Arc;

/// Client chosen for one request
pub struct ResolvedClient {
    pub client: Arc<dyn DriveClient>,
    /// Set when the requested identity could not be used
    pub warning: Option<UploadWarning>,
}

impl ResolvedClient {
    pub fn identity(&self) -> &Identity {
        self.client.identity()
    }
}

/// Names derived for one photo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoMetadata {
    /// Display name after sanitizing; `None` for anonymous uploads
    pub sanitized_name: Option<String>,
    pub filename: String,
    pub description: String,
}

/// Destination folder for one upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderResolution {
    /// `None` means the drive root of the acting identity
    pub folder_id: Option<String>,
    pub warning: Option<UploadWarning>,
}

/// A remote write handed to the upload executor
pub struct UploadJob {
    pub client: Arc<dyn DriveClient>,
    pub metadata: NewFile,
    pub content_type: String,
    pub content: Bytes,
}
