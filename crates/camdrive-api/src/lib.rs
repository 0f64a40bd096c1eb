//! Camdrive API Library
//!
//! This crate provides the photo upload service, the HTTP handlers that expose
//! it, and application setup.

mod handlers;
mod telemetry;

pub mod error;
pub mod services;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use services::upload::PhotoUploadService;
