//! Error types for platform API calls

use thiserror::Error;

/// Errors that can occur while talking to the platform REST API
#[derive(Error, Debug)]
pub enum ApiError {
    /// Credentials were rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A call was made before `authenticate`
    #[error("Not authenticated; call authenticate first")]
    NotAuthenticated,

    /// Transport-level failure
    #[error("Failed to reach {url}: {message}")]
    Network { url: String, message: String },

    /// Request timeout
    #[error("Request to {endpoint} timed out after {seconds} seconds")]
    Timeout { endpoint: String, seconds: u64 },

    /// Non-success HTTP status
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Http {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Response body did not have the expected shape
    #[error("Failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    /// The platform returned nothing for an object that should exist
    #[error("No metadata found for {0}")]
    NotFound(String),
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Authentication(msg) => format!(
                "Authentication failed: {msg}\n\n\
                Hints:\n\
                - Check TS_USERNAME and TS_PASSWORD in your .env file\n\
                - Check that the account is allowed to request full-access tokens"
            ),
            ApiError::Network { url, message } => format!(
                "Failed to reach {url}: {message}\n\n\
                Hints:\n\
                - Check TS_SERVER_URL\n\
                - Check your network connection or VPN"
            ),
            ApiError::Timeout { endpoint, seconds } => format!(
                "Request to {endpoint} timed out after {seconds} seconds.\n\n\
                Hint: increase the limit with --timeout"
            ),
            _ => self.to_string(),
        }
    }

    /// HTTP status, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
