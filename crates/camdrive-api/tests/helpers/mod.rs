//! Test helpers: build the router over an in-memory drive.
//!
//! Run from workspace root: `cargo test -p camdrive-api`.

#![allow(dead_code)]

pub mod fixtures;

use axum_test::TestServer;
use camdrive_api::services::upload::{PhotoUploadService, SystemClock};
use camdrive_api::setup::routes;
use camdrive_api::state::AppState;
use camdrive_core::Config;
use camdrive_storage::{MemoryClientFactory, MemoryDrive};
use std::collections::HashMap;
use std::sync::Arc;

pub const TEST_DOMAIN: &str = "test.com";

/// Test application: server plus the drive behind it.
pub struct TestApp {
    pub server: TestServer,
    pub drive: MemoryDrive,
    pub root_folder_id: String,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

/// Configuration for the memory backend with impersonation enabled.
pub fn test_config(extra: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = [
        ("DRIVE_BACKEND", "memory"),
        ("GOOGLE_DRIVE_IMPERSONATION_ENABLED", "true"),
        ("GOOGLE_DRIVE_IMPERSONATION_DOMAIN", TEST_DOMAIN),
        ("UPLOAD_WORKER_POOL_SIZE", "2"),
        ("MAX_FILE_SIZE_MB", "1"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in extra {
        vars.insert(k.to_string(), v.to_string());
    }

    Config::from_lookup(|key| vars.get(key).cloned()).expect("test config should be valid")
}

fn server_for(config: Config, uploads: PhotoUploadService) -> TestServer {
    let state = Arc::new(AppState::new(config.clone(), uploads));
    let router = routes::setup_routes(&config, state).expect("routes should build");
    TestServer::new(router).expect("test server should start")
}

/// App over a fresh memory drive with a seeded root folder.
pub async fn setup_test_app_with(extra: &[(&str, &str)]) -> TestApp {
    let drive = MemoryDrive::new();
    let root_folder_id = drive.insert_folder("camera-uploads", None);

    let mut config = test_config(extra);
    config.drive.folder_id = Some(root_folder_id.clone());

    let uploads = PhotoUploadService::with_factory(
        config.drive.clone(),
        Arc::new(MemoryClientFactory::new(drive.clone())),
        Arc::new(SystemClock),
    )
    .await;

    TestApp {
        server: server_for(config, uploads),
        drive,
        root_folder_id,
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(&[]).await
}

/// App whose drive integration is switched off.
pub async fn setup_disabled_app() -> TestServer {
    let config = test_config(&[
        ("GOOGLE_DRIVE_ENABLED", "false"),
        ("GOOGLE_DRIVE_FOLDER_ID", "ROOT123"),
    ]);
    let uploads = PhotoUploadService::initialize(&config.drive).await;
    server_for(config, uploads)
}
