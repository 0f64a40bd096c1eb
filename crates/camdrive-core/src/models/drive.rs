//! Remote drive entities as seen by this service.
//!
//! The remote system owns every one of these; the service only keeps the
//! identifiers it gets back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::constants::FOLDER_MIME_TYPE;

/// Identity a remote client acts as
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "account", rename_all = "snake_case")]
pub enum Identity {
    /// The service account itself
    Default,
    /// A workspace user reached through domain-wide delegation
    Impersonated(String),
}

impl Identity {
    pub fn account(&self) -> Option<&str> {
        match self {
            Identity::Default => None,
            Identity::Impersonated(email) => Some(email),
        }
    }

    pub fn is_impersonated(&self) -> bool {
        matches!(self, Identity::Impersonated(_))
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Identity::Default => write!(f, "default"),
            Identity::Impersonated(email) => write!(f, "impersonated:{}", email),
        }
    }
}

/// A folder that exists in the remote drive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRef {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// Metadata for a file or folder about to be created
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFile {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

impl NewFile {
    pub fn file(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            mime_type: None,
            parents: Vec::new(),
        }
    }

    pub fn folder(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            mime_type: Some(FOLDER_MIME_TYPE.to_string()),
            ..Self::file(name, description)
        }
    }

    /// Set the parent folder; blank ids are ignored.
    pub fn with_parent(mut self, parent: Option<&str>) -> Self {
        self.parents = parent
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| vec![p.to_string()])
            .unwrap_or_default();
        self
    }

    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }
}

/// A file created by an upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_content_link: Option<String>,
}

/// File details returned by a metadata lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_content_link: Option<String>,
}

impl FileInfo {
    /// One-line human readable summary
    pub fn summary(&self) -> String {
        format!(
            "File: {}, Size: {} bytes, Created: {}, View: {}",
            self.name,
            self.size.map(|s| s.to_string()).unwrap_or_else(|| "unknown".to_string()),
            self.created_time
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "unknown".to_string()),
            self.web_view_link.as_deref().unwrap_or("n/a"),
        )
    }
}

/// Metadata query against the remote drive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileQuery {
    pub mime_type: Option<String>,
    pub name: Option<String>,
    pub parent_id: Option<String>,
    pub trashed: Option<bool>,
}

impl FileQuery {
    /// Non-trashed folders with exactly `name`, optionally inside `parent_id`.
    pub fn folder_named(name: &str, parent_id: Option<&str>) -> Self {
        Self {
            mime_type: Some(FOLDER_MIME_TYPE.to_string()),
            name: Some(name.to_string()),
            parent_id: parent_id
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from),
            trashed: Some(false),
        }
    }

    /// Render as a Drive v3 `q` expression.
    pub fn to_query_string(&self) -> String {
        let mut clauses = Vec::new();
        if let Some(ref mime) = self.mime_type {
            clauses.push(format!("mimeType='{}'", escape_query_literal(mime)));
        }
        if let Some(ref name) = self.name {
            clauses.push(format!("name='{}'", escape_query_literal(name)));
        }
        if let Some(ref parent) = self.parent_id {
            clauses.push(format!("'{}' in parents", escape_query_literal(parent)));
        }
        if let Some(trashed) = self.trashed {
            clauses.push(format!("trashed={}", trashed));
        }
        clauses.join(" and ")
    }
}

/// Escape a value for use inside a single-quoted Drive query literal.
pub fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
