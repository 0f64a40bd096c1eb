//! Per-user folder resolution.
//!
//! Uploads with a display name go into `<name>-fotos` under the root folder.
//! The folder is looked up by name on every request and created when missing.
//! Lookup and creation are not atomic: two concurrent first uploads for the
//! same name may each create a folder.

use camdrive_core::constants::USER_FOLDER_DESCRIPTION;
use camdrive_core::models::{FileQuery, NewFile, UploadWarning};
use camdrive_storage::{DriveClient, DriveError, DriveResult};
use std::future::Future;
use std::time::Duration;

use super::metadata::user_folder_name;
use super::types::FolderResolution;

pub struct FolderResolver {
    root_folder_id: Option<String>,
    call_timeout: Duration,
}

impl FolderResolver {
    pub fn new(root_folder_id: Option<String>, call_timeout: Duration) -> Self {
        Self {
            root_folder_id: root_folder_id.filter(|id| !id.trim().is_empty()),
            call_timeout,
        }
    }

    pub fn root_folder_id(&self) -> Option<&str> {
        self.root_folder_id.as_deref()
    }

    async fn bounded<T>(&self, call: impl Future<Output = DriveResult<T>>) -> DriveResult<T> {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .map_err(|_| DriveError::Timeout(self.call_timeout.as_secs()))?
    }

    /// Destination for an upload; falls back to the root folder on any failure.
    pub async fn resolve_folder(
        &self,
        client: &dyn DriveClient,
        sanitized_name: Option<&str>,
    ) -> FolderResolution {
        let Some(name) = sanitized_name.filter(|n| !n.trim().is_empty()) else {
            return FolderResolution {
                folder_id: self.root_folder_id.clone(),
                warning: None,
            };
        };

        let folder_name = user_folder_name(name);
        match self.find_or_create(client, &folder_name).await {
            Ok(folder_id) => FolderResolution {
                folder_id: Some(folder_id),
                warning: None,
            },
            Err(e) => {
                tracing::error!(
                    error = %e,
                    folder_name = %folder_name,
                    identity = %client.identity(),
                    "Failed to resolve user folder, using root folder"
                );
                FolderResolution {
                    folder_id: self.root_folder_id.clone(),
                    warning: Some(UploadWarning::FolderFallback {
                        reason: format!("folder {} unavailable: {}", folder_name, e),
                    }),
                }
            }
        }
    }

    async fn find_or_create(&self, client: &dyn DriveClient, folder_name: &str) -> DriveResult<String> {
        let parent = self.root_folder_id();
        let query = FileQuery::folder_named(folder_name, parent);

        if let Some(existing) = self
            .bounded(client.list_files(&query, 1))
            .await?
            .into_iter()
            .next()
        {
            tracing::debug!(
                folder_id = %existing.id,
                folder_name = %folder_name,
                "Found existing user folder"
            );
            return Ok(existing.id);
        }

        let metadata = NewFile::folder(folder_name, USER_FOLDER_DESCRIPTION).with_parent(parent);
        let created = self.bounded(client.create_folder(&metadata)).await?;
        tracing::info!(
            folder_id = %created.id,
            folder_name = %folder_name,
            parent_id = ?parent,
            "Created user folder"
        );
        Ok(created.id)
    }
}
