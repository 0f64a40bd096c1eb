//! Camdrive Storage Library
//!
//! This crate provides the remote drive abstraction used by the upload
//! service: the [`DriveClient`] trait, the [`ClientFactory`] that builds
//! clients for a given identity, and two backends (Google Drive v3 and an
//! in-memory drive).
//!
//! # Identities
//!
//! Every client is scoped to exactly one [`Identity`]. The default identity is
//! the service account; impersonated identities are obtained through
//! domain-wide delegation, which performs a token exchange when the client is
//! built.

#[cfg(feature = "drive-google")]
pub mod auth;
pub mod factory;
#[cfg(feature = "drive-google")]
pub mod google;
#[cfg(feature = "drive-memory")]
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use camdrive_core::models::Identity;
pub use camdrive_core::DriveBackend;
pub use factory::create_client_factory;
#[cfg(feature = "drive-google")]
pub use factory::GoogleClientFactory;
#[cfg(feature = "drive-memory")]
pub use factory::MemoryClientFactory;
#[cfg(feature = "drive-google")]
pub use google::GoogleDriveClient;
#[cfg(feature = "drive-memory")]
pub use memory::{DriveOp, MemoryDrive, MemoryDriveClient};
pub use traits::{ClientFactory, DriveClient, DriveError, DriveResult};
