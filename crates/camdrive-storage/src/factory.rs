#[cfg(feature = "drive-google")]
use crate::auth::{ServiceAccountKey, ServiceAccountTokenSource, TokenSource};
#[cfg(feature = "drive-google")]
use crate::google::{DriveEndpoints, GoogleDriveClient};
#[cfg(feature = "drive-memory")]
use crate::memory::MemoryDrive;
use crate::{ClientFactory, DriveBackend, DriveClient, DriveError, DriveResult};
#[cfg(any(feature = "drive-google", feature = "drive-memory"))]
use async_trait::async_trait;
#[cfg(any(feature = "drive-google", feature = "drive-memory"))]
use camdrive_core::models::Identity;
use camdrive_core::DriveConfig;
use std::sync::Arc;

/// Builds Google Drive clients from one service-account key.
///
/// The default client is built once and shared so its token cache survives
/// across uploads. Impersonated clients are built per call and fetch their
/// first token eagerly, so a refused delegation surfaces here.
#[cfg(feature = "drive-google")]
pub struct GoogleClientFactory {
    http: reqwest::Client,
    key: Arc<ServiceAccountKey>,
    endpoints: DriveEndpoints,
    scope: String,
    default_client: Arc<GoogleDriveClient>,
}

#[cfg(feature = "drive-google")]
impl GoogleClientFactory {
    pub fn new(
        http: reqwest::Client,
        key: ServiceAccountKey,
        endpoints: DriveEndpoints,
        scope: impl Into<String>,
    ) -> Self {
        let key = Arc::new(key);
        let scope = scope.into();
        let tokens: Arc<dyn TokenSource> = Arc::new(ServiceAccountTokenSource::new(
            http.clone(),
            key.clone(),
            scope.clone(),
            None,
        ));
        let default_client = Arc::new(GoogleDriveClient::new(
            http.clone(),
            tokens,
            Identity::Default,
            endpoints.clone(),
        ));

        Self {
            http,
            key,
            endpoints,
            scope,
            default_client,
        }
    }

    /// Load the key named by the configuration and build the factory.
    pub async fn from_config(config: &DriveConfig) -> DriveResult<Self> {
        let path = config.credentials_path.as_deref().ok_or_else(|| {
            DriveError::Config("GOOGLE_DRIVE_CREDENTIALS_PATH not configured".to_string())
        })?;

        let key = ServiceAccountKey::from_file(path).await?;
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.call_timeout_secs))
            .build()
            .map_err(|e| DriveError::Config(format!("Failed to build HTTP client: {}", e)))?;

        tracing::info!(
            service_account = %key.client_email(),
            "Loaded Google Drive service account"
        );

        Ok(Self::new(
            http,
            key,
            DriveEndpoints::default(),
            camdrive_core::constants::DRIVE_FILE_SCOPE,
        ))
    }

    pub fn service_account_email(&self) -> &str {
        self.key.client_email()
    }
}

#[cfg(feature = "drive-google")]
#[async_trait]
impl ClientFactory for GoogleClientFactory {
    async fn build_default_client(&self) -> DriveResult<Arc<dyn DriveClient>> {
        Ok(self.default_client.clone())
    }

    async fn build_impersonated_client(
        &self,
        account_email: &str,
    ) -> DriveResult<Arc<dyn DriveClient>> {
        let tokens = Arc::new(ServiceAccountTokenSource::new(
            self.http.clone(),
            self.key.clone(),
            self.scope.clone(),
            Some(account_email.to_string()),
        ));
        tokens.access_token().await?;

        Ok(Arc::new(GoogleDriveClient::new(
            self.http.clone(),
            tokens,
            Identity::Impersonated(account_email.to_string()),
            self.endpoints.clone(),
        )))
    }

    fn backend_type(&self) -> DriveBackend {
        DriveBackend::Google
    }
}

/// Builds clients over a shared [`MemoryDrive`]
#[cfg(feature = "drive-memory")]
#[derive(Clone, Default)]
pub struct MemoryClientFactory {
    drive: MemoryDrive,
}

#[cfg(feature = "drive-memory")]
impl MemoryClientFactory {
    pub fn new(drive: MemoryDrive) -> Self {
        Self { drive }
    }

    pub fn drive(&self) -> &MemoryDrive {
        &self.drive
    }
}

#[cfg(feature = "drive-memory")]
#[async_trait]
impl ClientFactory for MemoryClientFactory {
    async fn build_default_client(&self) -> DriveResult<Arc<dyn DriveClient>> {
        Ok(Arc::new(self.drive.client(Identity::Default)))
    }

    async fn build_impersonated_client(
        &self,
        account_email: &str,
    ) -> DriveResult<Arc<dyn DriveClient>> {
        self.drive.delegate(account_email).await?;
        Ok(Arc::new(
            self.drive
                .client(Identity::Impersonated(account_email.to_string())),
        ))
    }

    fn backend_type(&self) -> DriveBackend {
        DriveBackend::Memory
    }
}

/// Create a client factory based on configuration
pub async fn create_client_factory(config: &DriveConfig) -> DriveResult<Arc<dyn ClientFactory>> {
    match config.backend {
        #[cfg(feature = "drive-google")]
        DriveBackend::Google => Ok(Arc::new(GoogleClientFactory::from_config(config).await?)),

        #[cfg(not(feature = "drive-google"))]
        DriveBackend::Google => Err(DriveError::Config(
            "Google Drive backend not available (drive-google feature not enabled)".to_string(),
        )),

        #[cfg(feature = "drive-memory")]
        DriveBackend::Memory => Ok(Arc::new(MemoryClientFactory::default())),

        #[cfg(not(feature = "drive-memory"))]
        DriveBackend::Memory => Err(DriveError::Config(
            "Memory drive backend not available (drive-memory feature not enabled)".to_string(),
        )),
    }
}
