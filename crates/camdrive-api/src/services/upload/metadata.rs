//! Filename and description construction for uploaded photos.

use camdrive_core::constants::{FORBIDDEN_NAME_CHARS, MAX_DISPLAY_NAME_CHARS, USER_FOLDER_SUFFIX};
use chrono::{Local, NaiveDateTime};

use super::types::PhotoMetadata;

const FILENAME_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const DESCRIPTION_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Source of the local wall-clock time used in names
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Strip forbidden characters and cap the length of a display name.
///
/// Returns `None` for a blank name. A name made only of forbidden characters
/// sanitizes to an empty string: it still prefixes the filename but gets no
/// user folder.
pub fn sanitize_display_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return None;
    }

    Some(
        trimmed
            .chars()
            .filter(|c| !FORBIDDEN_NAME_CHARS.contains(c))
            .take(MAX_DISPLAY_NAME_CHARS)
            .collect(),
    )
}

/// Folder name used for a sanitized display name
pub fn user_folder_name(sanitized: &str) -> String {
    format!("{}{}", sanitized, USER_FOLDER_SUFFIX)
}

pub fn build_metadata(
    display_name: Option<&str>,
    target_account: Option<&str>,
    now: NaiveDateTime,
) -> PhotoMetadata {
    let sanitized_name = display_name.and_then(sanitize_display_name);
    let timestamp = now.format(FILENAME_TIMESTAMP_FORMAT);

    let filename = match sanitized_name {
        Some(ref name) => format!("{}-camera-photo-{}.jpg", name, timestamp),
        None => format!("camera-photo-{}.jpg", timestamp),
    };

    let mut description = format!(
        "Photo taken from web camera at {}",
        now.format(DESCRIPTION_TIMESTAMP_FORMAT)
    );
    if let Some(account) = target_account.map(str::trim).filter(|a| !a.is_empty()) {
        description.push_str(&format!(" (uploaded to: {})", account));
    }

    PhotoMetadata {
        sanitized_name,
        filename,
        description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_anonymous_photo() {
        let meta = build_metadata(None, None, at(14, 30, 45));
        assert_eq!(meta.filename, "camera-photo-2025-01-15_14-30-45.jpg");
        assert_eq!(
            meta.description,
            "Photo taken from web camera at 15/01/2025 14:30:45"
        );
        assert!(meta.sanitized_name.is_none());
    }

    #[test]
    fn test_named_photo_with_account() {
        let meta = build_metadata(
            Some("  Ana García "),
            Some(" ana@test.com "),
            at(9, 5, 7),
        );
        assert_eq!(meta.sanitized_name.as_deref(), Some("Ana García"));
        assert_eq!(meta.filename, "Ana García-camera-photo-2025-01-15_09-05-07.jpg");
        assert!(meta.description.ends_with(" (uploaded to: ana@test.com)"));
    }

    #[test]
    fn test_forbidden_characters_are_removed() {
        let meta = build_metadata(Some("a<b>c:d\"e/f\\g|h?i*j"), None, at(0, 0, 0));
        assert_eq!(meta.sanitized_name.as_deref(), Some("abcdefghij"));
        for c in FORBIDDEN_NAME_CHARS {
            assert!(!meta.filename.contains(*c));
        }
    }

    #[test]
    fn test_long_names_are_truncated() {
        let long = "ñ".repeat(50);
        let meta = build_metadata(Some(&long), None, at(12, 0, 0));
        let sanitized = meta.sanitized_name.unwrap();
        assert_eq!(sanitized.chars().count(), MAX_DISPLAY_NAME_CHARS);

        let max_len = MAX_DISPLAY_NAME_CHARS + "-camera-photo-".len() + "2025-01-15_12-00-00".len() + 4;
        assert!(meta.filename.chars().count() <= max_len);
    }

    #[test]
    fn test_blank_name_is_anonymous() {
        assert!(sanitize_display_name("   ").is_none());
        let meta = build_metadata(Some("  "), None, at(1, 2, 3));
        assert_eq!(meta.filename, "camera-photo-2025-01-15_01-02-03.jpg");
    }

    #[test]
    fn test_fully_stripped_name_keeps_prefix_separator() {
        assert_eq!(sanitize_display_name("<>:*?").as_deref(), Some(""));
        let meta = build_metadata(Some("///"), None, at(1, 2, 3));
        assert_eq!(meta.sanitized_name.as_deref(), Some(""));
        assert_eq!(meta.filename, "-camera-photo-2025-01-15_01-02-03.jpg");
    }

    #[test]
    fn test_blank_account_is_not_described() {
        let meta = build_metadata(None, Some("   "), at(1, 2, 3));
        assert!(!meta.description.contains("uploaded to"));
    }

    #[test]
    fn test_user_folder_name() {
        assert_eq!(user_folder_name("Ana García"), "Ana García-fotos");
    }
}
