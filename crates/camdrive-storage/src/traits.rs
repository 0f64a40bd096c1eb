//! Drive abstraction traits
//!
//! This module defines the contract every remote drive backend implements and
//! the factory that produces identity-scoped clients.

use async_trait::async_trait;
use bytes::Bytes;
use camdrive_core::models::{FileInfo, FileQuery, FolderRef, Identity, NewFile, UploadedFile};
use camdrive_core::DriveBackend;
use std::sync::Arc;
use thiserror::Error;

/// Drive operation errors
#[derive(Debug, Error)]
pub enum DriveError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Delegation to {account} failed: {message}")]
    Delegation { account: String, message: String },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Drive API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Operation timed out after {0}s")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for drive operations
pub type DriveResult<T> = Result<T, DriveError>;

/// Authenticated handle to a remote drive, scoped to one identity.
///
/// Clients are shared read-only for the lifetime of a request and never
/// mutated after construction.
#[async_trait]
pub trait DriveClient: Send + Sync {
    /// Identity this client acts as
    fn identity(&self) -> &Identity;

    /// Create a file with binary content and return its identifier
    async fn create_file(
        &self,
        metadata: &NewFile,
        content_type: &str,
        content: Bytes,
    ) -> DriveResult<UploadedFile>;

    /// Return up to `page_size` entries matching `query`, in backend order
    async fn list_files(&self, query: &FileQuery, page_size: u32) -> DriveResult<Vec<FolderRef>>;

    /// Create a folder (metadata only)
    async fn create_folder(&self, metadata: &NewFile) -> DriveResult<FolderRef>;

    /// Fetch metadata for a single file
    async fn get_file(&self, file_id: &str) -> DriveResult<FileInfo>;

    /// Get the drive backend type
    fn backend_type(&self) -> DriveBackend;
}

/// Builds drive clients for the default or an impersonated identity.
///
/// Impersonated construction performs a live credential-delegation exchange
/// and may fail; callers decide how to degrade.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Client acting as the service account
    async fn build_default_client(&self) -> DriveResult<Arc<dyn DriveClient>>;

    /// Client acting as `account_email` through delegated credentials
    async fn build_impersonated_client(
        &self,
        account_email: &str,
    ) -> DriveResult<Arc<dyn DriveClient>>;

    /// Get the drive backend type
    fn backend_type(&self) -> DriveBackend;
}
