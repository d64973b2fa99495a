//! Error types for the mirror core.
//!
//! One enum covers every failure the synchronization core can surface.
//! Per-file problems during a scan are logged and skipped by the caller;
//! per-task problems propagate to the worker boundary, where they mark
//! the task failed without taking the worker down.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for mirror operations.
#[derive(Debug, Error)]
pub enum MirrorError {
    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Optional cause description
        cause: Option<String>,
    },

    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Download failed for {url}: {message}")]
    DownloadFailed { url: String, message: String },

    // Catalog response errors
    #[error("Version {version_id} not found for model {model_id}")]
    VersionNotFound { model_id: i64, version_id: i64 },

    #[error("No files available for version {version_id}")]
    NoFilesAvailable { version_id: i64 },

    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Task cancelled")]
    Cancelled,

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for mirror operations.
pub type Result<T> = std::result::Result<T, MirrorError>;

// Conversion implementations for common error types

impl From<std::io::Error> for MirrorError {
    fn from(err: std::io::Error) -> Self {
        MirrorError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for MirrorError {
    fn from(err: serde_json::Error) -> Self {
        MirrorError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for MirrorError {
    fn from(err: rusqlite::Error) -> Self {
        MirrorError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for MirrorError {
    fn from(err: reqwest::Error) -> Self {
        MirrorError::Network {
            message: err.to_string(),
            cause: err.url().map(|u| u.to_string()),
        }
    }
}

impl MirrorError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        MirrorError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// True if this error came from a remote lookup that simply had no
    /// match, as opposed to a transport or local failure.
    pub fn is_http_not_found(&self) -> bool {
        matches!(self, MirrorError::HttpStatus { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MirrorError::VersionNotFound {
            model_id: 42,
            version_id: 7,
        };
        assert_eq!(err.to_string(), "Version 7 not found for model 42");

        let err = MirrorError::HttpStatus {
            url: "https://example.com/x".into(),
            status: 503,
        };
        assert_eq!(err.to_string(), "https://example.com/x returned HTTP 503");
    }

    #[test]
    fn test_is_http_not_found() {
        let err = MirrorError::HttpStatus {
            url: "u".into(),
            status: 404,
        };
        assert!(err.is_http_not_found());

        let err = MirrorError::HttpStatus {
            url: "u".into(),
            status: 500,
        };
        assert!(!err.is_http_not_found());
    }

    #[test]
    fn test_io_with_path() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = MirrorError::io_with_path(io, "/tmp/x");
        match err {
            MirrorError::Io { path, .. } => {
                assert_eq!(path, Some(PathBuf::from("/tmp/x")));
            }
            _ => panic!("expected Io variant"),
        }
    }
}
