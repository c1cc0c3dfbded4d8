//! CLI command implementations

pub mod alerts;
pub mod archive;
pub mod dependents;
pub mod models;
pub mod session;

use std::path::PathBuf;

use secrecy::ExposeSecret as _;
use tracing::info;
use tsarc_core::{MetadataApi, RestApiClient, Settings, TOKEN_VALIDITY_SECS, validate_guid};

use crate::error::CliError;
use crate::output::OutputFormat;

/// Options shared by every command
pub struct GlobalArgs {
    /// Environment file with the `TS_*` variables
    pub env_file: PathBuf,
    /// Request timeout in seconds
    pub timeout: u64,
    /// Output format
    pub format: OutputFormat,
}

/// Resolve settings and log in
pub async fn connect(global: &GlobalArgs) -> Result<(Settings, RestApiClient), CliError> {
    let settings = Settings::from_env_file(&global.env_file)?;
    let mut client = RestApiClient::new(&settings.server_url)?.with_timeout(global.timeout)?;

    client
        .authenticate(
            &settings.username,
            settings.password.expose_secret(),
            TOKEN_VALIDITY_SECS,
        )
        .await?;
    info!(server = %settings.server_url, user = %settings.username, "Authenticated");

    Ok((settings, client))
}

/// Validate a GUID given on the command line
pub fn parse_guid(raw: &str) -> Result<String, CliError> {
    validate_guid(raw)
        .map_err(|e| CliError::InvalidArgument(format!("'{}' is not a valid GUID: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_guid() {
        assert_eq!(
            parse_guid(" 0A1B2C3D-4E5F-6071-8293-A4B5C6D7E8F9 ").unwrap(),
            "0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9"
        );
        assert!(matches!(
            parse_guid("not-a-guid"),
            Err(CliError::InvalidArgument(_))
        ));
    }
}
