pub mod file_info;
pub mod health;
pub mod photo_upload;
pub mod status;
