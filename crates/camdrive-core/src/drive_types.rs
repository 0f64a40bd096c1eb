use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Remote drive backend types
///
/// Defined in core because configuration selects the backend before any
/// storage crate code runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveBackend {
    Google,
    Memory,
}

impl FromStr for DriveBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "google" | "google-drive" | "gdrive" => Ok(DriveBackend::Google),
            "memory" => Ok(DriveBackend::Memory),
            _ => Err(anyhow::anyhow!("Invalid drive backend: {}", s)),
        }
    }
}

impl Display for DriveBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DriveBackend::Google => write!(f, "google"),
            DriveBackend::Memory => write!(f, "memory"),
        }
    }
}
