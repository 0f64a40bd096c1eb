use crate::auth::TokenSource;
use crate::traits::{DriveClient, DriveError, DriveResult};
use async_trait::async_trait;
use bytes::Bytes;
use camdrive_core::models::{FileInfo, FileQuery, FolderRef, Identity, NewFile, UploadedFile};
use camdrive_core::DriveBackend;
use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Response, StatusCode, Url};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Public Google APIs host
pub const GOOGLE_APIS_BASE: &str = "https://www.googleapis.com";

const UPLOAD_FIELDS: &str = "id,name,webViewLink,webContentLink";
const FOLDER_FIELDS: &str = "id,name,parents";
const LIST_FIELDS: &str = "files(id,name,parents)";
const INFO_FIELDS: &str = "id,name,mimeType,size,createdTime,webViewLink,webContentLink";

/// Base URLs of the Drive v3 metadata and upload endpoints
#[derive(Debug, Clone)]
pub struct DriveEndpoints {
    pub api_base: String,
    pub upload_base: String,
}

impl DriveEndpoints {
    /// Endpoints rooted at `base` (e.g. a local mock server)
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            api_base: format!("{}/drive/v3", base),
            upload_base: format!("{}/upload/drive/v3", base),
        }
    }
}

impl Default for DriveEndpoints {
    fn default() -> Self {
        Self::with_base_url(GOOGLE_APIS_BASE)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    parents: Vec<String>,
    #[serde(default)]
    mime_type: Option<String>,
    /// Drive reports sizes as decimal strings
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    web_view_link: Option<String>,
    #[serde(default)]
    web_content_link: Option<String>,
}

impl DriveFile {
    fn into_folder_ref(self) -> FolderRef {
        FolderRef {
            id: self.id,
            name: self.name,
            parent_id: self.parents.into_iter().next(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

/// Google Drive v3 client scoped to one identity
#[derive(Clone)]
pub struct GoogleDriveClient {
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
    identity: Identity,
    endpoints: DriveEndpoints,
}

impl GoogleDriveClient {
    pub fn new(
        http: reqwest::Client,
        tokens: Arc<dyn TokenSource>,
        identity: Identity,
        endpoints: DriveEndpoints,
    ) -> Self {
        Self {
            http,
            tokens,
            identity,
            endpoints,
        }
    }

    async fn bearer(&self) -> DriveResult<String> {
        Ok(format!("Bearer {}", self.tokens.access_token().await?))
    }

    /// URL of one file. The id is percent-encoded as a single path segment.
    fn file_url(&self, file_id: &str) -> DriveResult<Url> {
        if matches!(file_id, "" | "." | "..") {
            return Err(DriveError::NotFound(format!("invalid file id '{}'", file_id)));
        }
        let mut url = Url::parse(&self.endpoints.api_base)
            .map_err(|e| DriveError::Config(format!("invalid Drive API base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| DriveError::Config("Drive API base URL cannot take a path".to_string()))?
            .pop_if_empty()
            .push("files")
            .push(file_id);
        Ok(url)
    }

    /// Turn a non-success response into a typed error
    async fn check(response: Response, context: &str) -> DriveResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.error.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or(body);

        if status == StatusCode::NOT_FOUND {
            return Err(DriveError::NotFound(format!("{}: {}", context, message)));
        }

        Err(DriveError::Api {
            status: status.as_u16(),
            message: format!("{}: {}", context, message),
        })
    }

    /// Assemble a `multipart/related` body: JSON metadata part, then media part.
    fn multipart_related(
        boundary: &str,
        metadata: &NewFile,
        content_type: &str,
        content: &[u8],
    ) -> DriveResult<Vec<u8>> {
        let metadata_json = serde_json::to_vec(metadata)
            .map_err(|e| DriveError::Request(format!("Failed to encode metadata: {}", e)))?;

        let mut body = Vec::with_capacity(content.len() + metadata_json.len() + 256);
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
        body.extend_from_slice(&metadata_json);
        body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        body.extend_from_slice(format!("Content-Length: {}\r\n\r\n", content.len()).as_bytes());
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
        Ok(body)
    }
}

#[async_trait]
impl DriveClient for GoogleDriveClient {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    async fn create_file(
        &self,
        metadata: &NewFile,
        content_type: &str,
        content: Bytes,
    ) -> DriveResult<UploadedFile> {
        let start = std::time::Instant::now();
        let size = content.len();
        let boundary = format!("camdrive-{}", Uuid::new_v4().simple());
        let body = Self::multipart_related(&boundary, metadata, content_type, &content)?;

        let response = self
            .http
            .post(format!("{}/files", self.endpoints.upload_base))
            .query(&[("uploadType", "multipart"), ("fields", UPLOAD_FIELDS)])
            .header(AUTHORIZATION, self.bearer().await?)
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| DriveError::Request(e.to_string()))?;

        let response = Self::check(response, "create file").await.map_err(|e| {
            tracing::error!(
                error = %e,
                name = %metadata.name,
                size_bytes = size,
                identity = %self.identity,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Drive upload failed"
            );
            e
        })?;

        let file: DriveFile = response
            .json()
            .await
            .map_err(|e| DriveError::InvalidResponse(e.to_string()))?;

        tracing::info!(
            file_id = %file.id,
            name = %file.name,
            size_bytes = size,
            identity = %self.identity,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Drive upload successful"
        );

        Ok(UploadedFile {
            id: file.id,
            name: file.name,
            web_view_link: file.web_view_link,
            web_content_link: file.web_content_link,
        })
    }

    async fn list_files(&self, query: &FileQuery, page_size: u32) -> DriveResult<Vec<FolderRef>> {
        let q = query.to_query_string();
        let page_size = page_size.max(1).to_string();

        let response = self
            .http
            .get(format!("{}/files", self.endpoints.api_base))
            .query(&[
                ("q", q.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", page_size.as_str()),
                ("spaces", "drive"),
            ])
            .header(AUTHORIZATION, self.bearer().await?)
            .send()
            .await
            .map_err(|e| DriveError::Request(e.to_string()))?;

        let list: FileList = Self::check(response, "list files")
            .await?
            .json()
            .await
            .map_err(|e| DriveError::InvalidResponse(e.to_string()))?;

        tracing::debug!(query = %q, matches = list.files.len(), "Drive query completed");

        Ok(list
            .files
            .into_iter()
            .map(DriveFile::into_folder_ref)
            .collect())
    }

    async fn create_folder(&self, metadata: &NewFile) -> DriveResult<FolderRef> {
        let response = self
            .http
            .post(format!("{}/files", self.endpoints.api_base))
            .query(&[("fields", FOLDER_FIELDS)])
            .header(AUTHORIZATION, self.bearer().await?)
            .json(metadata)
            .send()
            .await
            .map_err(|e| DriveError::Request(e.to_string()))?;

        let folder: DriveFile = Self::check(response, "create folder")
            .await?
            .json()
            .await
            .map_err(|e| DriveError::InvalidResponse(e.to_string()))?;

        Ok(folder.into_folder_ref())
    }

    async fn get_file(&self, file_id: &str) -> DriveResult<FileInfo> {
        let response = self
            .http
            .get(self.file_url(file_id)?)
            .query(&[("fields", INFO_FIELDS)])
            .header(AUTHORIZATION, self.bearer().await?)
            .send()
            .await
            .map_err(|e| DriveError::Request(e.to_string()))?;

        let file: DriveFile = Self::check(response, "get file")
            .await?
            .json()
            .await
            .map_err(|e| DriveError::InvalidResponse(e.to_string()))?;

        Ok(FileInfo {
            size: file.size.as_deref().and_then(|s| s.parse().ok()),
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            created_time: file.created_time,
            web_view_link: file.web_view_link,
            web_content_link: file.web_content_link,
        })
    }

    fn backend_type(&self) -> DriveBackend {
        DriveBackend::Google
    }
}
