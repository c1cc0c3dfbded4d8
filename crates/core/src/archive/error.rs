//! Error types for archive runs

use std::path::PathBuf;
use thiserror::Error;

use crate::api::ApiError;

/// Errors that abort an archive run
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Archive configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Platform API failure on a step that has no safe fallback
    #[error("{step} failed: {source}")]
    Api {
        step: &'static str,
        #[source]
        source: ApiError,
    },

    /// IO error with path context
    #[error("IO error with {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;

impl ArchiveError {
    pub(crate) fn api(step: &'static str, source: ApiError) -> Self {
        ArchiveError::Api { step, source }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiveError::Io {
            path: path.into(),
            source,
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            ArchiveError::Api { step, source } => format!("{step} failed.\n\n{}", source.user_message()),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ArchiveError::api(
            "Listing models",
            ApiError::Http {
                endpoint: "/metadata/search".to_string(),
                status: 500,
                body: "boom".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "Listing models failed: /metadata/search returned HTTP 500: boom"
        );

        let err = ArchiveError::io(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "IO error with /tmp/x: denied");
    }
}
