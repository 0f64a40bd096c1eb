//! Constants shared by the upload service and the drive backends.

/// Mime type Google Drive uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// OAuth scope limited to files created by this application.
pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// Suffix appended to a sanitized display name to form the per-user folder name.
pub const USER_FOLDER_SUFFIX: &str = "-fotos";

/// Description set on per-user folders when they are created.
pub const USER_FOLDER_DESCRIPTION: &str =
    "Carpeta de fotos para el usuario - creada automáticamente";

/// Maximum number of characters kept from a display name.
pub const MAX_DISPLAY_NAME_CHARS: usize = 30;

/// Characters stripped from display names before they are used in names.
pub const FORBIDDEN_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Default size of the upload worker pool.
pub const DEFAULT_UPLOAD_WORKERS: usize = 5;

/// Default timeout applied to every remote call, in seconds.
pub const DEFAULT_DRIVE_CALL_TIMEOUT_SECS: u64 = 30;
