//! Photo upload orchestration
//!
//! Identity selection, name construction, folder resolution and bounded
//! execution of the remote write. [`PhotoUploadService`] is the entry point;
//! the other modules are its building blocks.

pub mod executor;
pub mod folder;
pub mod identity;
pub mod metadata;
pub mod service;
pub mod types;

pub use executor::{UploadExecutor, UploadHandle};
pub use folder::FolderResolver;
pub use identity::IdentityResolver;
pub use metadata::{build_metadata, Clock, SystemClock};
pub use service::PhotoUploadService;
pub use types::{FolderResolution, PhotoMetadata, ResolvedClient, UploadJob};
