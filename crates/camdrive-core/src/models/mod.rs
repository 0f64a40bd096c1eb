pub mod drive;
pub mod status;
pub mod upload;

pub use drive::{FileInfo, FileQuery, FolderRef, Identity, NewFile, UploadedFile};
pub use status::DriveStatus;
pub use upload::{UploadOutcome, UploadRequest, UploadWarning};
