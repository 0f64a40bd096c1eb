//! Photo upload service
//!
//! Owns everything an upload needs (default client, client factory, worker
//! pool, clock) and runs one upload end to end. The request is validated on
//! the caller's task. Identity selection, folder resolution and the write then
//! run together as one job on the worker pool.

use bytes::Bytes;
use camdrive_core::models::{
    DriveStatus, FileInfo, Identity, NewFile, UploadOutcome, UploadRequest, UploadWarning,
};
use camdrive_core::{AppError, DriveConfig};
use camdrive_storage::{create_client_factory, ClientFactory, DriveClient};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

use super::executor::{run_upload, UploadExecutor};
use super::folder::FolderResolver;
use super::identity::IdentityResolver;
use super::metadata::{build_metadata, Clock, SystemClock};
use super::types::UploadJob;
use crate::error::remote_error;

/// Live drive wiring, present only when the service is configured
struct DriveHandles {
    identities: IdentityResolver,
    folders: FolderResolver,
}

impl DriveHandles {
    /// Remote part of an upload. Runs while holding a pool permit.
    async fn upload(
        &self,
        request: UploadRequest,
        clock: &dyn Clock,
        call_timeout: Duration,
    ) -> Result<UploadOutcome, AppError> {
        let start = Instant::now();

        let resolved = self
            .identities
            .resolve_client(request.target_account.as_deref())
            .await;

        let photo = build_metadata(
            request.display_name.as_deref(),
            request.target_account.as_deref(),
            clock.now(),
        );

        let folder = self
            .folders
            .resolve_folder(resolved.client.as_ref(), photo.sanitized_name.as_deref())
            .await;

        let identity = resolved.identity().clone();
        let warnings: Vec<UploadWarning> = resolved
            .warning
            .into_iter()
            .chain(folder.warning)
            .collect();

        let job = UploadJob {
            client: resolved.client,
            metadata: NewFile::file(&photo.filename, &photo.description)
                .with_parent(folder.folder_id.as_deref()),
            content_type: request.content_type,
            content: Bytes::from(request.content),
        };

        let uploaded = run_upload(job, call_timeout).await?;

        tracing::info!(
            file_id = %uploaded.id,
            file_name = %uploaded.name,
            folder_id = ?folder.folder_id,
            identity = %identity,
            warnings = warnings.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Photo uploaded to Google Drive"
        );

        Ok(UploadOutcome {
            file_id: uploaded.id,
            file_name: uploaded.name,
            folder_id: folder.folder_id,
            identity,
            warnings,
        })
    }
}

enum ServiceState {
    Ready(Arc<DriveHandles>),
    NotConfigured(String),
}

pub struct PhotoUploadService {
    config: DriveConfig,
    state: ServiceState,
    executor: UploadExecutor,
    clock: Arc<dyn Clock>,
}

/// `true` when `content_type` names an image media type.
pub fn is_image_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().to_ascii_lowercase())
        .is_some_and(|essence| essence.starts_with("image/") && essence.len() > "image/".len())
}

/// Drive ids are URL-safe base64 style tokens.
pub fn is_valid_file_id(file_id: &str) -> bool {
    !file_id.is_empty()
        && file_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Reject requests that must never reach the remote drive.
pub fn validate_request(request: &UploadRequest) -> Result<(), AppError> {
    if request.content.is_empty() {
        return Err(AppError::InvalidInput("No file provided".to_string()));
    }
    if !is_image_content_type(&request.content_type) {
        return Err(AppError::InvalidInput("File must be an image".to_string()));
    }
    Ok(())
}

impl PhotoUploadService {
    /// Build the service from configuration.
    ///
    /// Never fails: a disabled integration or unusable credentials leave the
    /// service in the not-configured state, which every upload reports.
    pub async fn initialize(config: &DriveConfig) -> Self {
        if !config.enabled {
            tracing::info!("Google Drive integration disabled");
            return Self::not_configured(config.clone(), "Google Drive integration is disabled");
        }

        match create_client_factory(config).await {
            Ok(factory) => Self::with_factory(config.clone(), factory, Arc::new(SystemClock)).await,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    backend = %config.backend,
                    "Failed to initialize Google Drive client, uploads are disabled"
                );
                Self::not_configured(config.clone(), e.to_string())
            }
        }
    }

    /// Build the service over an existing client factory.
    pub async fn with_factory(
        config: DriveConfig,
        factory: Arc<dyn ClientFactory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let call_timeout = Duration::from_secs(config.call_timeout_secs);
        let executor = UploadExecutor::new(config.worker_pool_size, call_timeout);

        let default_client = match Self::build_default_client(&config, factory.as_ref(), call_timeout).await {
            Ok(client) => client,
            Err(reason) => {
                tracing::error!(error = %reason, "Failed to build default drive client");
                return Self {
                    config,
                    state: ServiceState::NotConfigured(reason),
                    executor,
                    clock,
                };
            }
        };

        tracing::info!(
            backend = %factory.backend_type(),
            identity = %default_client.identity(),
            root_folder_id = ?config.folder_id,
            impersonation_enabled = config.impersonation_enabled,
            workers = executor.pool_size(),
            "Google Drive upload service initialized"
        );

        let identities = IdentityResolver::new(
            factory,
            default_client,
            config.impersonation_enabled,
            config.impersonation_domain.clone(),
            call_timeout,
        );
        let folders = FolderResolver::new(config.folder_id.clone(), call_timeout);

        Self {
            config,
            state: ServiceState::Ready(Arc::new(DriveHandles {
                identities,
                folders,
            })),
            executor,
            clock,
        }
    }

    pub fn not_configured(config: DriveConfig, reason: impl Into<String>) -> Self {
        let executor = UploadExecutor::new(
            config.worker_pool_size,
            Duration::from_secs(config.call_timeout_secs),
        );
        Self {
            config,
            state: ServiceState::NotConfigured(reason.into()),
            executor,
            clock: Arc::new(SystemClock),
        }
    }

    /// Default client: the configured default account when impersonation is
    /// enabled, otherwise the service account.
    async fn build_default_client(
        config: &DriveConfig,
        factory: &dyn ClientFactory,
        call_timeout: Duration,
    ) -> Result<Arc<dyn DriveClient>, String> {
        let default_user = config
            .default_user
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());

        if let (true, Some(user)) = (config.impersonation_enabled, default_user) {
            match tokio::time::timeout(call_timeout, factory.build_impersonated_client(user)).await {
                Ok(Ok(client)) => return Ok(client),
                Ok(Err(e)) => tracing::warn!(
                    error = %e,
                    account = %user,
                    "Default account impersonation failed, using service account"
                ),
                Err(_) => tracing::warn!(
                    account = %user,
                    "Default account impersonation timed out, using service account"
                ),
            }
        }

        match tokio::time::timeout(call_timeout, factory.build_default_client()).await {
            Ok(Ok(client)) => Ok(client),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "building the default client timed out after {}s",
                call_timeout.as_secs()
            )),
        }
    }

    fn handles(&self) -> Result<&Arc<DriveHandles>, AppError> {
        match self.state {
            ServiceState::Ready(ref handles) => Ok(handles),
            ServiceState::NotConfigured(ref reason) => Err(AppError::NotConfigured(reason.clone())),
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self.state, ServiceState::Ready(_))
    }

    /// Identity uploads use when no account is requested
    pub fn default_identity(&self) -> Option<&Identity> {
        self.handles()
            .ok()
            .map(|h| h.identities.default_client().identity())
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    pub fn status(&self) -> DriveStatus {
        DriveStatus {
            configured: self.is_configured(),
            root_folder_id: self.config.folder_id.clone().unwrap_or_default(),
            impersonation_enabled: self.config.impersonation_enabled,
            domain: self.config.impersonation_domain.clone(),
            default_account: self.config.default_user.clone(),
        }
    }

    /// Upload one photo.
    ///
    /// Identity and folder problems degrade to defaults and are reported in
    /// [`UploadOutcome::warnings`]; only invalid input, a missing
    /// configuration or a failed write are errors.
    #[tracing::instrument(
        skip(self, request),
        fields(
            size_bytes = request.size(),
            content_type = %request.content_type,
            operation = "upload_photo"
        )
    )]
    pub async fn upload_photo(&self, request: UploadRequest) -> Result<UploadOutcome, AppError> {
        validate_request(&request)?;
        let handles = self.handles()?.clone();
        let clock = self.clock.clone();
        let call_timeout = self.executor.call_timeout();

        self.executor
            .spawn(
                async move { handles.upload(request, clock.as_ref(), call_timeout).await }
                    .in_current_span(),
            )
            .await
    }

    /// Metadata of a file, read with the default client.
    pub async fn file_info(&self, file_id: &str) -> Result<FileInfo, AppError> {
        let file_id = file_id.trim();
        if file_id.is_empty() {
            return Err(AppError::InvalidInput("File ID is required".to_string()));
        }
        if !is_valid_file_id(file_id) {
            return Err(AppError::InvalidInput(format!("Invalid file ID '{}'", file_id)));
        }

        let client = self.handles()?.identities.default_client().clone();
        let id = file_id.to_string();
        let call_timeout = self.executor.call_timeout();

        let info = self
            .executor
            .spawn(async move {
                tokio::time::timeout(call_timeout, client.get_file(&id))
                    .await
                    .map_err(|_| {
                        AppError::Remote(format!(
                            "file lookup timed out after {}s",
                            call_timeout.as_secs()
                        ))
                    })?
                    .map_err(remote_error)
            })
            .await?;

        tracing::debug!(file = %info.summary(), "Fetched file info");
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camdrive_core::DriveBackend;
    use camdrive_storage::{DriveOp, MemoryClientFactory, MemoryDrive};
    use chrono::{NaiveDate, NaiveDateTime};

    struct FixedClock(NaiveDateTime);

    impl Clock for FixedClock {
        fn now(&self) -> NaiveDateTime {
            self.0
        }
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(
            NaiveDate::from_ymd_opt(2025, 1, 15)
                .unwrap()
                .and_hms_opt(14, 30, 45)
                .unwrap(),
        ))
    }

    fn config(root: Option<&str>) -> DriveConfig {
        DriveConfig {
            backend: DriveBackend::Memory,
            folder_id: root.map(String::from),
            impersonation_enabled: true,
            impersonation_domain: Some("test.com".to_string()),
            ..DriveConfig::default()
        }
    }

    async fn service(drive: &MemoryDrive, config: DriveConfig) -> PhotoUploadService {
        PhotoUploadService::with_factory(
            config,
            Arc::new(MemoryClientFactory::new(drive.clone())),
            clock(),
        )
        .await
    }

    fn jpeg() -> Vec<u8> {
        vec![0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10]
    }

    #[test]
    fn test_image_content_types() {
        assert!(is_image_content_type("image/jpeg"));
        assert!(is_image_content_type("IMAGE/PNG; charset=binary"));
        assert!(!is_image_content_type("text/plain"));
        assert!(!is_image_content_type("image/"));
        assert!(!is_image_content_type(""));
    }

    #[tokio::test]
    async fn test_named_upload_creates_user_folder() {
        let drive = MemoryDrive::new();
        let root = drive.insert_folder("camera", None);
        let service = service(&drive, config(Some(&root))).await;

        let request = UploadRequest::new(jpeg(), "image/jpeg").with_display_name(Some("Ana García"));
        let outcome = service.upload_photo(request).await.unwrap();

        assert_eq!(outcome.file_name, "Ana García-camera-photo-2025-01-15_14-30-45.jpg");
        assert_eq!(outcome.identity, Identity::Default);
        assert!(!outcome.is_degraded());

        let folder = &drive.folders_named("Ana García-fotos")[0];
        assert_eq!(folder.parent_id(), Some(root.as_str()));
        assert_eq!(outcome.folder_id.as_deref(), Some(folder.id.as_str()));

        let stored = drive.get(&outcome.file_id).unwrap();
        assert_eq!(stored.parent_id(), Some(folder.id.as_str()));
        assert_eq!(stored.content.as_ref(), jpeg().as_slice());
        assert_eq!(
            stored.description(),
            Some("Photo taken from web camera at 15/01/2025 14:30:45")
        );
    }

    #[tokio::test]
    async fn test_invalid_input_makes_no_remote_calls() {
        let drive = MemoryDrive::new();
        let service = service(&drive, config(None)).await;

        let err = service
            .upload_photo(UploadRequest::new(b"hello".to_vec(), "text/plain"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref m) if m == "File must be an image"));

        let err = service
            .upload_photo(UploadRequest::new(Vec::new(), "image/jpeg"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref m) if m == "No file provided"));

        assert!(drive.calls().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_domain_uploads_with_default_identity() {
        let drive = MemoryDrive::new();
        let service = service(&drive, config(None)).await;

        let request = UploadRequest::new(jpeg(), "image/jpeg")
            .with_target_account(Some("user@wrongdomain.com"));
        let outcome = service.upload_photo(request).await.unwrap();

        assert_eq!(outcome.identity, Identity::Default);
        assert!(matches!(
            outcome.warnings.as_slice(),
            [UploadWarning::IdentityFallback { .. }]
        ));
        let stored = drive.get(&outcome.file_id).unwrap();
        assert!(stored
            .description()
            .unwrap()
            .ends_with("(uploaded to: user@wrongdomain.com)"));
    }

    #[tokio::test]
    async fn test_in_domain_account_uploads_as_that_account() {
        let drive = MemoryDrive::new();
        let service = service(&drive, config(None)).await;

        let request = UploadRequest::new(jpeg(), "image/jpeg")
            .with_display_name(Some("Ana"))
            .with_target_account(Some("Ana@test.com"));
        let outcome = service.upload_photo(request).await.unwrap();

        let ana = Identity::Impersonated("ana@test.com".to_string());
        assert_eq!(outcome.identity, ana);
        assert_eq!(drive.get(&outcome.file_id).unwrap().owner, ana);
        assert_eq!(drive.folders_named("Ana-fotos")[0].owner, ana);
    }

    #[tokio::test]
    async fn test_folder_failure_still_uploads_to_root() {
        let drive = MemoryDrive::new();
        drive.fail(DriveOp::ListFiles, "rate limited");
        let service = service(&drive, config(Some("ROOT123"))).await;

        let request = UploadRequest::new(jpeg(), "image/jpeg").with_display_name(Some("Ana"));
        let outcome = service.upload_photo(request).await.unwrap();

        assert_eq!(outcome.folder_id.as_deref(), Some("ROOT123"));
        assert!(matches!(
            outcome.warnings.as_slice(),
            [UploadWarning::FolderFallback { .. }]
        ));
    }

    #[tokio::test]
    async fn test_write_failure_is_upload_failed() {
        let drive = MemoryDrive::new();
        drive.fail(DriveOp::CreateFile, "backend exploded");
        let service = service(&drive, config(None)).await;

        let err = service
            .upload_photo(UploadRequest::new(jpeg(), "image/jpeg"))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Failed to upload photo to Google Drive"));
        assert!(err.to_string().contains("backend exploded"));
    }

    #[tokio::test]
    async fn test_disabled_service_is_not_configured() {
        let config = DriveConfig {
            enabled: false,
            ..config(Some("ROOT123"))
        };
        let service = PhotoUploadService::initialize(&config).await;

        let status = service.status();
        assert!(!status.configured);
        assert_eq!(status.root_folder_id, "ROOT123");

        let err = service
            .upload_photo(UploadRequest::new(jpeg(), "image/jpeg"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_unreadable_credentials_leave_service_unconfigured() {
        let config = DriveConfig {
            backend: DriveBackend::Google,
            credentials_path: Some("/nonexistent/key.json".to_string()),
            ..DriveConfig::default()
        };
        let service = PhotoUploadService::initialize(&config).await;
        assert!(!service.is_configured());
        assert!(service.default_identity().is_none());
    }

    #[tokio::test]
    async fn test_default_user_is_impersonated_at_startup() {
        let drive = MemoryDrive::new();
        let service = service(
            &drive,
            DriveConfig {
                default_user: Some("camera@test.com".to_string()),
                ..config(None)
            },
        )
        .await;
        assert_eq!(
            service.default_identity(),
            Some(&Identity::Impersonated("camera@test.com".to_string()))
        );

        let outcome = service
            .upload_photo(UploadRequest::new(jpeg(), "image/jpeg"))
            .await
            .unwrap();
        assert_eq!(outcome.identity.account(), Some("camera@test.com"));
    }

    #[tokio::test]
    async fn test_refused_default_user_falls_back_to_service_account() {
        let drive = MemoryDrive::new();
        drive.reject_all_delegation();
        let service = service(
            &drive,
            DriveConfig {
                default_user: Some("camera@test.com".to_string()),
                ..config(None)
            },
        )
        .await;
        assert!(service.is_configured());
        assert_eq!(service.default_identity(), Some(&Identity::Default));
    }

    async fn start_uploads(
        service: &Arc<PhotoUploadService>,
        requests: Vec<UploadRequest>,
    ) -> Vec<tokio::task::JoinHandle<Result<UploadOutcome, AppError>>> {
        let handles = requests
            .into_iter()
            .map(|request| {
                let service = service.clone();
                tokio::spawn(async move { service.upload_photo(request).await })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(10)).await;
        handles
    }

    #[tokio::test(start_paused = true)]
    async fn test_folder_lookups_wait_for_a_worker() {
        let drive = MemoryDrive::new();
        drive.delay(DriveOp::ListFiles, Duration::from_secs(5));
        let service = Arc::new(
            service(
                &drive,
                DriveConfig {
                    worker_pool_size: 1,
                    ..config(Some("ROOT"))
                },
            )
            .await,
        );

        let requests = (0..5)
            .map(|i| {
                UploadRequest::new(jpeg(), "image/jpeg").with_display_name(Some(format!("user{}", i)))
            })
            .collect();
        let uploads = start_uploads(&service, requests).await;

        assert_eq!(drive.call_count(DriveOp::ListFiles), 1);
        assert_eq!(service.executor.available_workers(), 0);

        for upload in uploads {
            upload.await.unwrap().unwrap();
        }
        assert_eq!(drive.call_count(DriveOp::ListFiles), 5);
        assert_eq!(drive.files().len(), 5);
        assert_eq!(service.executor.available_workers(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delegations_wait_for_a_worker() {
        let drive = MemoryDrive::new();
        drive.delay(DriveOp::Delegate, Duration::from_secs(5));
        let service = Arc::new(
            service(
                &drive,
                DriveConfig {
                    worker_pool_size: 2,
                    ..config(None)
                },
            )
            .await,
        );

        let requests = (0..4)
            .map(|i| {
                UploadRequest::new(jpeg(), "image/jpeg")
                    .with_target_account(Some(format!("user{}@test.com", i)))
            })
            .collect();
        let uploads = start_uploads(&service, requests).await;

        assert_eq!(drive.call_count(DriveOp::Delegate), 2);
        assert_eq!(drive.call_count(DriveOp::CreateFile), 0);

        for upload in uploads {
            let outcome = upload.await.unwrap().unwrap();
            assert!(outcome.identity.account().is_some());
        }
        assert_eq!(drive.call_count(DriveOp::Delegate), 4);
    }

    #[test]
    fn test_file_ids() {
        assert!(is_valid_file_id("1AbC_d-E"));
        assert!(is_valid_file_id("file-0001"));
        assert!(!is_valid_file_id(""));
        assert!(!is_valid_file_id(".."));
        assert!(!is_valid_file_id("../../about?fields=user"));
        assert!(!is_valid_file_id("a/b"));
    }

    #[tokio::test]
    async fn test_file_info_rejects_path_like_ids_without_calls() {
        let drive = MemoryDrive::new();
        let service = service(&drive, config(None)).await;

        let err = service
            .file_info("../../../about?fields=user")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(drive.call_count(DriveOp::GetFile), 0);
    }

    #[tokio::test]
    async fn test_file_info_maps_missing_file() {
        let drive = MemoryDrive::new();
        let service = service(&drive, config(None)).await;

        let outcome = service
            .upload_photo(UploadRequest::new(jpeg(), "image/jpeg"))
            .await
            .unwrap();
        let info = service.file_info(&outcome.file_id).await.unwrap();
        assert_eq!(info.size, Some(jpeg().len() as u64));

        let err = service.file_info("missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
