//! tsarc core - find and archive stale models on a ThoughtSpot-style platform
//!
//! Provides:
//! - Environment-file configuration (`config`)
//! - The platform REST API client and its test double (`api`)
//! - Metadata records shared by every stage (`metadata`)
//! - Impression and alert signals (`usage`)
//! - The stale-model pipeline and archive writer (`archive`)

pub mod api;
pub mod archive;
pub mod config;
pub mod metadata;
pub mod usage;

// Re-export commonly used types
pub use api::{ApiError, ApiResult, MetadataApi, RestApiClient, TOKEN_VALIDITY_SECS};
#[cfg(any(test, feature = "test-support"))]
pub use api::MockMetadataApi;
pub use archive::{
    ArchiveConfig, ArchiveError, ArchiveExecutor, ArchiveReport, ArchiveResult, ArchiveStage,
    Candidate, Exclusion, SampleReport, StaleCriteria,
};
pub use config::{ConfigError, EnvFile, Settings};
pub use metadata::{
    AlertStatus, Dependent, EdocFormat, ExportOptions, LogicalTable, ModelPage, TmlExport,
    validate_guid,
};
