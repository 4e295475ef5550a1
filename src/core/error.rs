use std::path::PathBuf;
use thiserror::Error;

/// Central error type for package acquisition.
/// Every fallible module returns `Result<T, InstallError>`.
#[derive(Debug, Error)]
pub enum InstallError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Invalid manifest URL: {0}")]
    InvalidUrl(String),

    #[error("Offline mode and no cached manifest for {url}")]
    OfflineCacheMiss { url: String },

    // ── Integrity ───────────────────────────────────────
    #[error("Manifest from {url} failed validation; nothing was stored")]
    ManifestRejected { url: String },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Config ──────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(String),

    // ── Task ────────────────────────────────────────────
    #[error("Transfer cancelled")]
    Cancelled,

    #[error("Background work was lost: {0}")]
    TaskLost(String),
}

/// Convenience alias used throughout the crate.
pub type InstallResult<T> = Result<T, InstallError>;

/// Coarse failure category a task owner can surface without matching
/// on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    Validation,
    Storage,
    Other,
}

impl InstallError {
    pub fn kind(&self) -> FailureKind {
        match self {
            InstallError::Http(_)
            | InstallError::DownloadFailed { .. }
            | InstallError::InvalidUrl(_)
            | InstallError::OfflineCacheMiss { .. } => FailureKind::Network,
            InstallError::ManifestRejected { .. } | InstallError::Json(_) => {
                FailureKind::Validation
            }
            InstallError::Io { .. } => FailureKind::Storage,
            InstallError::Config(_) | InstallError::Cancelled | InstallError::TaskLost(_) => {
                FailureKind::Other
            }
        }
    }
}

impl From<std::io::Error> for InstallError {
    fn from(source: std::io::Error) -> Self {
        InstallError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

// Owners forward failures over IPC/logs as plain strings.
impl serde::Serialize for InstallError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_split_network_from_validation() {
        let not_found = InstallError::DownloadFailed {
            url: "https://example.com/m.json".into(),
            status: 404,
        };
        let rejected = InstallError::ManifestRejected {
            url: "https://example.com/m.json".into(),
        };
        assert_eq!(not_found.kind(), FailureKind::Network);
        assert_eq!(rejected.kind(), FailureKind::Validation);
    }

    #[test]
    fn serializes_as_display_string() {
        let err = InstallError::DownloadFailed {
            url: "https://example.com/m.json".into(),
            status: 404,
        };
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(
            json,
            "\"Download failed for https://example.com/m.json: HTTP 404\""
        );
    }
}
