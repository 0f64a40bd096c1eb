//! In-memory drive backend.
//!
//! Keeps files and folders in process memory and records the calls made
//! against it (counts for every call, details for the most recent ones). Failures and latency can be injected per operation, which makes
//! it the backend of choice for tests and local development.

use crate::traits::{DriveClient, DriveError, DriveResult};
use async_trait::async_trait;
use bytes::Bytes;
use camdrive_core::models::{FileInfo, FileQuery, FolderRef, Identity, NewFile, UploadedFile};
use camdrive_core::DriveBackend;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Most recent calls kept in the call log
pub const CALL_LOG_CAPACITY: usize = 1024;

/// Remote operations that can be observed or sabotaged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriveOp {
    /// Delegated credential exchange for an impersonated account
    Delegate,
    CreateFile,
    ListFiles,
    CreateFolder,
    GetFile,
}

/// A call observed by the memory drive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub op: DriveOp,
    pub identity: Identity,
    /// Name, query or id the call was about
    pub target: String,
}

/// A file or folder held by the memory drive
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub id: String,
    pub metadata: NewFile,
    pub content_type: Option<String>,
    pub content: Bytes,
    pub owner: Identity,
    pub created_time: DateTime<Utc>,
}

impl StoredFile {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.metadata.parents.first().map(String::as_str)
    }

    pub fn description(&self) -> Option<&str> {
        self.metadata.description.as_deref()
    }

    fn to_folder_ref(&self) -> FolderRef {
        FolderRef {
            id: self.id.clone(),
            name: self.metadata.name.clone(),
            parent_id: self.parent_id().map(String::from),
        }
    }

    fn matches(&self, query: &FileQuery) -> bool {
        if let Some(ref mime) = query.mime_type {
            if self.metadata.mime_type.as_deref() != Some(mime.as_str()) {
                return false;
            }
        }
        if let Some(ref name) = query.name {
            if &self.metadata.name != name {
                return false;
            }
        }
        if let Some(ref parent) = query.parent_id {
            if !self.metadata.parents.iter().any(|p| p == parent) {
                return false;
            }
        }
        true
    }
}

#[derive(Default)]
struct DriveState {
    /// Insertion order is the listing order.
    entries: Vec<StoredFile>,
    calls: VecDeque<RecordedCall>,
    call_counts: HashMap<DriveOp, usize>,
    failures: HashMap<DriveOp, String>,
    delays: HashMap<DriveOp, Duration>,
    rejected_accounts: HashSet<String>,
    reject_all_delegation: bool,
    next_id: u64,
}

impl DriveState {
    fn allocate_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{:04}", prefix, self.next_id)
    }
}

/// Shared in-memory drive; clones observe the same state.
#[derive(Clone, Default)]
pub struct MemoryDrive {
    state: Arc<Mutex<DriveState>>,
}

impl MemoryDrive {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, DriveState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Client bound to `identity`
    pub fn client(&self, identity: Identity) -> MemoryDriveClient {
        MemoryDriveClient {
            drive: self.clone(),
            identity,
        }
    }

    /// Seed a folder without recording a call; returns its id.
    pub fn insert_folder(&self, name: &str, parent_id: Option<&str>) -> String {
        let mut state = self.state();
        let id = state.allocate_id("folder");
        state.entries.push(StoredFile {
            id: id.clone(),
            metadata: NewFile::folder(name, "").with_parent(parent_id),
            content_type: None,
            content: Bytes::new(),
            owner: Identity::Default,
            created_time: Utc::now(),
        });
        id
    }

    /// Make every future `op` fail with `message` until cleared.
    pub fn fail(&self, op: DriveOp, message: impl Into<String>) {
        self.state().failures.insert(op, message.into());
    }

    pub fn clear_failure(&self, op: DriveOp) {
        self.state().failures.remove(&op);
    }

    /// Delay every future `op` by `delay` before it runs.
    pub fn delay(&self, op: DriveOp, delay: Duration) {
        self.state().delays.insert(op, delay);
    }

    /// Refuse delegation for one account
    pub fn reject_delegation(&self, account: &str) {
        self.state()
            .rejected_accounts
            .insert(account.to_lowercase());
    }

    /// Refuse delegation for every account
    pub fn reject_all_delegation(&self) {
        self.state().reject_all_delegation = true;
    }

    /// Every call made so far, in order
    /// Most recent calls, oldest first, at most [`CALL_LOG_CAPACITY`]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.iter().cloned().collect()
    }

    /// Calls of `op` since the drive was created
    pub fn call_count(&self, op: DriveOp) -> usize {
        self.state().call_counts.get(&op).copied().unwrap_or(0)
    }

    /// Uploaded files (folders excluded), in creation order
    pub fn files(&self) -> Vec<StoredFile> {
        self.state()
            .entries
            .iter()
            .filter(|e| !e.metadata.is_folder())
            .cloned()
            .collect()
    }

    /// Folders with exactly `name`, in creation order
    pub fn folders_named(&self, name: &str) -> Vec<StoredFile> {
        self.state()
            .entries
            .iter()
            .filter(|e| e.metadata.is_folder() && e.metadata.name == name)
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<StoredFile> {
        self.state().entries.iter().find(|e| e.id == id).cloned()
    }

    /// Record the call, then apply injected delay and failure.
    async fn enter(&self, op: DriveOp, identity: &Identity, target: &str) -> DriveResult<()> {
        let (delay, failure) = {
            let mut state = self.state();
            if state.calls.len() == CALL_LOG_CAPACITY {
                state.calls.pop_front();
            }
            state.calls.push_back(RecordedCall {
                op,
                identity: identity.clone(),
                target: target.to_string(),
            });
            *state.call_counts.entry(op).or_default() += 1;
            (state.delays.get(&op).copied(), state.failures.get(&op).cloned())
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match failure {
            Some(message) if op == DriveOp::Delegate => Err(DriveError::Delegation {
                account: target.to_string(),
                message,
            }),
            Some(message) => Err(DriveError::Api {
                status: 500,
                message,
            }),
            None => Ok(()),
        }
    }

    /// Simulated delegated credential exchange for `account`
    pub async fn delegate(&self, account: &str) -> DriveResult<()> {
        self.enter(DriveOp::Delegate, &Identity::Default, account)
            .await?;

        let state = self.state();
        if state.reject_all_delegation || state.rejected_accounts.contains(&account.to_lowercase()) {
            return Err(DriveError::Delegation {
                account: account.to_string(),
                message: "unauthorized_client: Client is unauthorized to retrieve access tokens"
                    .to_string(),
            });
        }
        Ok(())
    }
}

/// Memory drive client scoped to one identity
#[derive(Clone)]
pub struct MemoryDriveClient {
    drive: MemoryDrive,
    identity: Identity,
}

impl MemoryDriveClient {
    pub fn drive(&self) -> &MemoryDrive {
        &self.drive
    }
}

#[async_trait]
impl DriveClient for MemoryDriveClient {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    async fn create_file(
        &self,
        metadata: &NewFile,
        content_type: &str,
        content: Bytes,
    ) -> DriveResult<UploadedFile> {
        self.drive
            .enter(DriveOp::CreateFile, &self.identity, &metadata.name)
            .await?;

        let mut state = self.drive.state();
        let id = state.allocate_id("file");
        state.entries.push(StoredFile {
            id: id.clone(),
            metadata: metadata.clone(),
            content_type: Some(content_type.to_string()),
            content,
            owner: self.identity.clone(),
            created_time: Utc::now(),
        });

        Ok(UploadedFile {
            web_view_link: Some(format!("memory://view/{}", id)),
            web_content_link: Some(format!("memory://content/{}", id)),
            name: metadata.name.clone(),
            id,
        })
    }

    async fn list_files(&self, query: &FileQuery, page_size: u32) -> DriveResult<Vec<FolderRef>> {
        let q = query.to_query_string();
        self.drive
            .enter(DriveOp::ListFiles, &self.identity, &q)
            .await?;

        let state = self.drive.state();
        Ok(state
            .entries
            .iter()
            .filter(|e| e.matches(query))
            .take(page_size.max(1) as usize)
            .map(StoredFile::to_folder_ref)
            .collect())
    }

    async fn create_folder(&self, metadata: &NewFile) -> DriveResult<FolderRef> {
        self.drive
            .enter(DriveOp::CreateFolder, &self.identity, &metadata.name)
            .await?;

        let mut state = self.drive.state();
        let id = state.allocate_id("folder");
        let folder = StoredFile {
            id,
            metadata: metadata.clone(),
            content_type: None,
            content: Bytes::new(),
            owner: self.identity.clone(),
            created_time: Utc::now(),
        };
        let folder_ref = folder.to_folder_ref();
        state.entries.push(folder);
        Ok(folder_ref)
    }

    async fn get_file(&self, file_id: &str) -> DriveResult<FileInfo> {
        self.drive
            .enter(DriveOp::GetFile, &self.identity, file_id)
            .await?;

        let state = self.drive.state();
        let entry = state
            .entries
            .iter()
            .find(|e| e.id == file_id)
            .ok_or_else(|| DriveError::NotFound(file_id.to_string()))?;

        Ok(FileInfo {
            id: entry.id.clone(),
            name: entry.metadata.name.clone(),
            mime_type: entry
                .metadata
                .mime_type
                .clone()
                .or_else(|| entry.content_type.clone()),
            size: Some(entry.content.len() as u64),
            created_time: Some(entry.created_time),
            web_view_link: Some(format!("memory://view/{}", entry.id)),
            web_content_link: Some(format!("memory://content/{}", entry.id)),
        })
    }

    fn backend_type(&self) -> DriveBackend {
        DriveBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_call_log_keeps_most_recent_calls() {
        let drive = MemoryDrive::new();
        let client = drive.client(Identity::Default);
        let total = CALL_LOG_CAPACITY + 10;

        for i in 0..total {
            let _ = client.get_file(&format!("id-{}", i)).await;
        }

        let calls = drive.calls();
        assert_eq!(calls.len(), CALL_LOG_CAPACITY);
        assert_eq!(calls[0].target, "id-10");
        assert_eq!(calls[CALL_LOG_CAPACITY - 1].target, format!("id-{}", total - 1));
        assert_eq!(drive.call_count(DriveOp::GetFile), total);
    }

    #[tokio::test]
    async fn test_create_and_get_file() {
        let drive = MemoryDrive::new();
        let client = drive.client(Identity::Default);

        let uploaded = client
            .create_file(
                &NewFile::file("a.jpg", "desc"),
                "image/jpeg",
                Bytes::from_static(b"abc"),
            )
            .await
            .unwrap();

        let info = client.get_file(&uploaded.id).await.unwrap();
        assert_eq!(info.name, "a.jpg");
        assert_eq!(info.size, Some(3));
        assert_eq!(info.mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(drive.files().len(), 1);
    }

    #[tokio::test]
    async fn test_list_filters_by_name_and_parent() {
        let drive = MemoryDrive::new();
        let root = drive.insert_folder("root", None);
        let inside = drive.insert_folder("Ana-fotos", Some(&root));
        drive.insert_folder("Ana-fotos", None);

        let client = drive.client(Identity::Default);
        let found = client
            .list_files(&FileQuery::folder_named("Ana-fotos", Some(&root)), 1)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, inside);

        let unscoped = client
            .list_files(&FileQuery::folder_named("Ana-fotos", None), 10)
            .await
            .unwrap();
        assert_eq!(unscoped.len(), 2);
    }

    #[tokio::test]
    async fn test_injected_failure_and_call_log() {
        let drive = MemoryDrive::new();
        drive.fail(DriveOp::CreateFile, "quota exceeded");
        let client = drive.client(Identity::Impersonated("ana@test.com".to_string()));

        let err = client
            .create_file(&NewFile::file("a.jpg", "d"), "image/jpeg", Bytes::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));

        let calls = drive.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].op, DriveOp::CreateFile);
        assert!(calls[0].identity.is_impersonated());

        drive.clear_failure(DriveOp::CreateFile);
        assert!(client
            .create_file(&NewFile::file("a.jpg", "d"), "image/jpeg", Bytes::new())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_delegation_rejection_is_case_insensitive() {
        let drive = MemoryDrive::new();
        drive.reject_delegation("Ana@Test.com");

        let err = drive.delegate("ana@test.com").await.unwrap_err();
        assert!(matches!(err, DriveError::Delegation { .. }));
        assert!(drive.delegate("bob@test.com").await.is_ok());
        assert_eq!(drive.call_count(DriveOp::Delegate), 2);
    }

    #[tokio::test]
    async fn test_get_missing_file_is_not_found() {
        let drive = MemoryDrive::new();
        let err = drive
            .client(Identity::Default)
            .get_file("nope")
            .await
            .unwrap_err();
        assert!(matches!(err, DriveError::NotFound(_)));
    }
}
