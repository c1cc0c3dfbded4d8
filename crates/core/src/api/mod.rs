//! Platform REST API access
//!
//! - `MetadataApi`: the operations the archiver needs
//! - `RestApiClient`: reqwest implementation against `/api/rest/2.0`
//! - `MockMetadataApi`: in-memory implementation (tests, `test-support`)

mod client;
mod error;
#[cfg(any(test, feature = "test-support"))]
mod mock;
mod rest;
pub mod types;

pub use client::{MetadataApi, TOKEN_VALIDITY_SECS};
pub use error::{ApiError, ApiResult};
#[cfg(any(test, feature = "test-support"))]
pub use mock::MockMetadataApi;
pub use rest::{DEFAULT_TIMEOUT_SECS, RestApiClient};
