//! Platform API trait
//!
//! The archive pipeline only talks to the platform through `MetadataApi`, so
//! the REST client can be swapped for an in-memory one in tests.

use async_trait::async_trait;

use super::error::ApiResult;
use crate::metadata::{Dependent, ExportOptions, ModelPage, TmlExport};

/// Token lifetime requested at login
pub const TOKEN_VALIDITY_SECS: u64 = 3600;

/// Operations the archiver needs from the platform metadata API
#[async_trait]
pub trait MetadataApi: Send + Sync {
    /// Log in and keep the bearer token for subsequent calls
    async fn authenticate(
        &mut self,
        username: &str,
        password: &str,
        validity_secs: u64,
    ) -> ApiResult<()>;

    /// One page of logical tables
    async fn search_models(&self, record_offset: u32, record_size: u32) -> ApiResult<ModelPage>;

    /// Objects that depend on a model
    async fn fetch_dependents(&self, model_id: &str) -> ApiResult<Vec<Dependent>>;

    /// Impressions recorded for an object over the last `lookback_days`
    ///
    /// # Arguments
    /// * `logical_table_id` - usage-statistics table to query
    /// * `object_id` - answer or liveboard GUID
    async fn count_impressions(
        &self,
        logical_table_id: &str,
        object_id: &str,
        lookback_days: u32,
    ) -> ApiResult<u64>;

    /// Export the TML of an object
    async fn export_tml(&self, guid: &str, options: ExportOptions) -> ApiResult<Vec<TmlExport>>;

    /// Sharing permissions of an object, as returned by the platform
    async fn fetch_permissions(&self, guid: &str) -> ApiResult<serde_json::Value>;

    /// Details of the logged-in session user
    async fn session_user(&self) -> ApiResult<serde_json::Value>;
}
