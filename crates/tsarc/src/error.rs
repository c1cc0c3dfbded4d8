//! CLI error types

use thiserror::Error;
use tsarc_core::{ApiError, ArchiveError, ConfigError};

/// Errors reported by `tsarc` commands
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Output error: {0}")]
    OutputError(String),
}

impl CliError {
    /// Message printed to stderr before exiting
    pub fn user_message(&self) -> String {
        match self {
            CliError::Config(e) => e.user_message(),
            CliError::Api(e) => e.user_message(),
            CliError::Archive(e) => e.user_message(),
            _ => self.to_string(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::OutputError(e.to_string())
    }
}
