use serde::Serialize;

use super::drive::Identity;

/// A single photo upload as handed over by the HTTP layer
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub content: Vec<u8>,
    pub content_type: String,
    pub display_name: Option<String>,
    pub target_account: Option<String>,
}

impl UploadRequest {
    pub fn new(content: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_type: content_type.into(),
            display_name: None,
            target_account: None,
        }
    }

    pub fn with_display_name(mut self, name: Option<impl Into<String>>) -> Self {
        self.display_name = name.map(Into::into);
        self
    }

    pub fn with_target_account(mut self, account: Option<impl Into<String>>) -> Self {
        self.target_account = account.map(Into::into);
        self
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Bookkeeping that degraded without failing the upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UploadWarning {
    /// The requested account could not be impersonated; the default identity was used.
    IdentityFallback { reason: String },
    /// The per-user folder could not be resolved; the root folder was used.
    FolderFallback { reason: String },
}

impl UploadWarning {
    pub fn reason(&self) -> &str {
        match self {
            UploadWarning::IdentityFallback { reason } | UploadWarning::FolderFallback { reason } => {
                reason
            }
        }
    }
}

/// Result of a successful upload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub file_id: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    pub identity: Identity,
    pub warnings: Vec<UploadWarning>,
}

impl UploadOutcome {
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}
