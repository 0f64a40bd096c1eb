//! Camdrive Core Library
//!
//! This crate provides the configuration, error taxonomy and domain models
//! shared by the storage backends and the upload service.

pub mod config;
pub mod constants;
pub mod drive_types;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{BaseConfig, Config, DriveConfig};
pub use drive_types::DriveBackend;
pub use error::{AppError, ErrorMetadata, LogLevel};
