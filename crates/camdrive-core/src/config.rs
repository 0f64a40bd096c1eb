//! Configuration module
//!
//! Configuration is read once at startup from the process environment (and an
//! optional `.env` file). There is no runtime reconfiguration.

use std::env;

use crate::constants::{DEFAULT_DRIVE_CALL_TIMEOUT_SECS, DEFAULT_UPLOAD_WORKERS};
use crate::drive_types::DriveBackend;

const SERVER_PORT: u16 = 8080;
const MAX_FILE_SIZE_MB: usize = 10;

/// Server-level settings shared by every entry point
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub max_file_size_bytes: usize,
}

/// Google Drive upload settings
#[derive(Clone, Debug)]
pub struct DriveConfig {
    pub enabled: bool,
    pub backend: DriveBackend,
    pub credentials_path: Option<String>,
    /// Root folder for uploads; `None` means the drive root of the identity.
    pub folder_id: Option<String>,
    pub impersonation_enabled: bool,
    /// Workspace domain that impersonated accounts must belong to.
    pub impersonation_domain: Option<String>,
    pub default_user: Option<String>,
    pub worker_pool_size: usize,
    pub call_timeout_secs: u64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: DriveBackend::Google,
            credentials_path: None,
            folder_id: None,
            impersonation_enabled: false,
            impersonation_domain: None,
            default_user: None,
            worker_pool_size: DEFAULT_UPLOAD_WORKERS,
            call_timeout_secs: DEFAULT_DRIVE_CALL_TIMEOUT_SECS,
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub base: BaseConfig,
    pub drive: DriveConfig,
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_name(&self.base.environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(var: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let flag = |key: &str, default: bool| {
            var(key)
                .map(|v| v.trim().to_lowercase())
                .and_then(|v| v.parse::<bool>().ok())
                .unwrap_or(default)
        };

        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins_str = var("CORS_ORIGINS").unwrap_or_else(|| "*".to_string());
        if is_production_name(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_file_size_mb = var("MAX_FILE_SIZE_MB")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(MAX_FILE_SIZE_MB);

        let base = BaseConfig {
            server_port: var("PORT")
                .unwrap_or_else(|| SERVER_PORT.to_string())
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
        };

        let backend = match non_empty("DRIVE_BACKEND") {
            Some(value) => value.parse()?,
            None => DriveBackend::Google,
        };

        let drive = DriveConfig {
            enabled: flag("GOOGLE_DRIVE_ENABLED", true),
            backend,
            credentials_path: non_empty("GOOGLE_DRIVE_CREDENTIALS_PATH"),
            folder_id: non_empty("GOOGLE_DRIVE_FOLDER_ID"),
            impersonation_enabled: flag("GOOGLE_DRIVE_IMPERSONATION_ENABLED", false),
            impersonation_domain: non_empty("GOOGLE_DRIVE_IMPERSONATION_DOMAIN")
                .map(|d| d.trim_start_matches('@').to_lowercase()),
            default_user: non_empty("GOOGLE_DRIVE_IMPERSONATION_DEFAULT_USER"),
            worker_pool_size: var("UPLOAD_WORKER_POOL_SIZE")
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_UPLOAD_WORKERS),
            call_timeout_secs: var("DRIVE_CALL_TIMEOUT_SECS")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_DRIVE_CALL_TIMEOUT_SECS),
        };

        let config = Config { base, drive };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let drive = &self.drive;

        if drive.worker_pool_size == 0 {
            return Err(anyhow::anyhow!("UPLOAD_WORKER_POOL_SIZE must be at least 1"));
        }

        if !drive.enabled {
            return Ok(());
        }

        if drive.impersonation_enabled && drive.impersonation_domain.is_none() {
            return Err(anyhow::anyhow!(
                "GOOGLE_DRIVE_IMPERSONATION_DOMAIN must be set when impersonation is enabled"
            ));
        }

        if drive.backend == DriveBackend::Google && drive.credentials_path.is_none() {
            return Err(anyhow::anyhow!(
                "GOOGLE_DRIVE_CREDENTIALS_PATH must be set when using the Google Drive backend"
            ));
        }

        Ok(())
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.base.environment
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.base.max_file_size_bytes
    }
}

fn is_production_name(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, anyhow::Error> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_with_memory_backend() {
        let config = config_from(&[("DRIVE_BACKEND", "memory")]).unwrap();
        assert_eq!(config.server_port(), 8080);
        assert!(config.drive.enabled);
        assert!(!config.drive.impersonation_enabled);
        assert_eq!(config.drive.worker_pool_size, 5);
        assert_eq!(config.drive.call_timeout_secs, 30);
        assert_eq!(config.max_file_size_bytes(), 10 * 1024 * 1024);
        assert!(config.drive.folder_id.is_none());
    }

    #[test]
    fn test_google_backend_requires_credentials() {
        let err = config_from(&[]).unwrap_err();
        assert!(err.to_string().contains("GOOGLE_DRIVE_CREDENTIALS_PATH"));
    }

    #[test]
    fn test_disabled_skips_drive_validation() {
        let config = config_from(&[("GOOGLE_DRIVE_ENABLED", "false")]).unwrap();
        assert!(!config.drive.enabled);
    }

    #[test]
    fn test_impersonation_requires_domain() {
        let err = config_from(&[
            ("DRIVE_BACKEND", "memory"),
            ("GOOGLE_DRIVE_IMPERSONATION_ENABLED", "true"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("IMPERSONATION_DOMAIN"));
    }

    #[test]
    fn test_impersonation_domain_is_normalized() {
        let config = config_from(&[
            ("DRIVE_BACKEND", "memory"),
            ("GOOGLE_DRIVE_IMPERSONATION_ENABLED", "TRUE"),
            ("GOOGLE_DRIVE_IMPERSONATION_DOMAIN", "@Test.COM"),
            ("GOOGLE_DRIVE_FOLDER_ID", "  "),
        ])
        .unwrap();
        assert!(config.drive.impersonation_enabled);
        assert_eq!(config.drive.impersonation_domain.as_deref(), Some("test.com"));
        assert!(config.drive.folder_id.is_none());
    }

    #[test]
    fn test_wildcard_cors_rejected_in_production() {
        let err = config_from(&[("DRIVE_BACKEND", "memory"), ("ENVIRONMENT", "production")])
            .unwrap_err();
        assert!(err.to_string().contains("CORS_ORIGINS"));
    }

    #[test]
    fn test_invalid_pool_size_falls_back_to_default() {
        let config = config_from(&[
            ("DRIVE_BACKEND", "memory"),
            ("UPLOAD_WORKER_POOL_SIZE", "0"),
            ("DRIVE_CALL_TIMEOUT_SECS", "abc"),
        ])
        .unwrap();
        assert_eq!(config.drive.worker_pool_size, 5);
        assert_eq!(config.drive.call_timeout_secs, 30);
    }
}
