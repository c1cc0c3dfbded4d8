//! In-memory `MetadataApi` for tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::client::MetadataApi;
use super::error::{ApiError, ApiResult};
use crate::metadata::{Dependent, ExportOptions, LogicalTable, ModelPage, TmlExport};
use crate::usage::ALERTS_FILENAME;

/// A mock platform that serves canned metadata
#[derive(Default)]
pub struct MockMetadataApi {
    /// `None` stands for a listing item without a readable header
    models: Vec<Option<LogicalTable>>,
    dependents: HashMap<String, Vec<Dependent>>,
    impressions: HashMap<String, u64>,
    alerts: HashSet<String>,
    failing_dependents: HashSet<String>,
    vanished: HashSet<String>,
    failing_impressions: HashSet<String>,
    failing_exports: HashSet<String>,
    erroring_exports: HashSet<String>,
    permissions: HashMap<String, serde_json::Value>,
    reject_login: bool,
    token: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl MockMetadataApi {
    /// Create an empty mock platform
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a model
    pub fn with_model(mut self, model: LogicalTable) -> Self {
        self.models.push(Some(model));
        self
    }

    /// Add a listing item that cannot be read as a model
    pub fn with_unreadable_model(mut self) -> Self {
        self.models.push(None);
        self
    }

    /// Add a dependent of `model_id`
    pub fn with_dependent(mut self, model_id: &str, dependent: Dependent) -> Self {
        self.dependents
            .entry(model_id.to_string())
            .or_default()
            .push(dependent);
        self
    }

    /// Set the impression count of an object
    pub fn with_impressions(mut self, object_id: &str, count: u64) -> Self {
        self.impressions.insert(object_id.to_string(), count);
        self
    }

    /// Attach an alert to an object
    pub fn with_alert(mut self, object_id: &str) -> Self {
        self.alerts.insert(object_id.to_string());
        self
    }

    /// Make dependent listing for a model fail
    pub fn failing_dependents(mut self, model_id: &str) -> Self {
        self.failing_dependents.insert(model_id.to_string());
        self
    }

    /// Make impression lookups for an object fail
    pub fn failing_impressions(mut self, object_id: &str) -> Self {
        self.failing_impressions.insert(object_id.to_string());
        self
    }

    /// Make TML exports of an object fail
    pub fn failing_export(mut self, object_id: &str) -> Self {
        self.failing_exports.insert(object_id.to_string());
        self
    }

    /// Keep a model listed but answer its dependents lookup with nothing
    pub fn vanishing_model(mut self, model_id: &str) -> Self {
        self.vanished.insert(model_id.to_string());
        self
    }

    /// Make TML exports of an object succeed with only an `ERROR` item
    pub fn erroring_export(mut self, object_id: &str) -> Self {
        self.erroring_exports.insert(object_id.to_string());
        self
    }

    /// Set the permissions document of an object
    pub fn with_permissions(mut self, object_id: &str, permissions: serde_json::Value) -> Self {
        self.permissions.insert(object_id.to_string(), permissions);
        self
    }

    /// Reject every login attempt
    pub fn rejecting_login(mut self) -> Self {
        self.reject_login = true;
        self
    }

    /// Calls made so far, as `operation:argument`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn check_token(&self) -> ApiResult<()> {
        self.token.as_ref().map(|_| ()).ok_or(ApiError::NotAuthenticated)
    }

    fn http_error(endpoint: &str, status: u16) -> ApiError {
        ApiError::Http {
            endpoint: endpoint.to_string(),
            status,
            body: "mock failure".to_string(),
        }
    }
}

#[async_trait]
impl MetadataApi for MockMetadataApi {
    async fn authenticate(
        &mut self,
        username: &str,
        _password: &str,
        _validity_secs: u64,
    ) -> ApiResult<()> {
        self.record(format!("authenticate:{}", username));
        if self.reject_login {
            return Err(ApiError::Authentication("HTTP 401: bad credentials".to_string()));
        }
        self.token = Some(format!("token-for-{}", username));
        Ok(())
    }

    async fn search_models(
        &self,
        record_offset: u32,
        record_size: u32,
    ) -> ApiResult<ModelPage> {
        self.check_token()?;
        self.record(format!("search_models:{}", record_offset));
        let items: Vec<&Option<LogicalTable>> = self
            .models
            .iter()
            .skip(record_offset as usize)
            .take(record_size as usize)
            .collect();
        Ok(ModelPage {
            fetched: items.len(),
            models: items.into_iter().flatten().cloned().collect(),
        })
    }

    async fn fetch_dependents(&self, model_id: &str) -> ApiResult<Vec<Dependent>> {
        self.check_token()?;
        self.record(format!("fetch_dependents:{}", model_id));
        if self.failing_dependents.contains(model_id) {
            return Err(Self::http_error("/metadata/search", 500));
        }
        if let Some(dependents) = self.dependents.get(model_id) {
            return Ok(dependents.clone());
        }
        let known = !self.vanished.contains(model_id)
            && self.models.iter().flatten().any(|m| m.id == model_id);
        if known {
            Ok(Vec::new())
        } else {
            Err(ApiError::NotFound(format!("model {}", model_id)))
        }
    }

    async fn count_impressions(
        &self,
        _logical_table_id: &str,
        object_id: &str,
        _lookback_days: u32,
    ) -> ApiResult<u64> {
        self.check_token()?;
        self.record(format!("count_impressions:{}", object_id));
        if self.failing_impressions.contains(object_id) {
            return Err(Self::http_error("/searchdata", 500));
        }
        Ok(self.impressions.get(object_id).copied().unwrap_or(0))
    }

    async fn export_tml(&self, guid: &str, options: ExportOptions) -> ApiResult<Vec<TmlExport>> {
        self.check_token()?;
        self.record(format!("export_tml:{}", guid));
        if self.failing_exports.contains(guid) {
            return Err(Self::http_error("/metadata/tml/export", 400));
        }

        if self.erroring_exports.contains(guid) {
            return Ok(vec![TmlExport {
                filename: None,
                id: Some(guid.to_string()),
                name: Some(guid.to_string()),
                object_type: None,
                status: Some("ERROR".to_string()),
                edoc: None,
            }]);
        }

        let mut items = vec![TmlExport {
            filename: Some(format!("{}.tml", guid)),
            id: Some(guid.to_string()),
            name: Some(guid.to_string()),
            object_type: Some("logical_table".to_string()),
            status: Some("OK".to_string()),
            edoc: Some(format!("{{\"guid\": \"{}\"}}", guid)),
        }];
        if options.export_associated && self.alerts.contains(guid) {
            items.push(TmlExport {
                filename: Some(ALERTS_FILENAME.to_string()),
                id: None,
                name: None,
                object_type: Some("alert".to_string()),
                status: Some("OK".to_string()),
                edoc: Some("alerts: []".to_string()),
            });
        }
        Ok(items)
    }

    async fn fetch_permissions(&self, guid: &str) -> ApiResult<serde_json::Value> {
        self.check_token()?;
        self.record(format!("fetch_permissions:{}", guid));
        self.permissions
            .get(guid)
            .cloned()
            .ok_or_else(|| Self::http_error("/security/metadata/fetch-permissions", 404))
    }

    async fn session_user(&self) -> ApiResult<serde_json::Value> {
        self.check_token()?;
        Ok(serde_json::json!({"name": "mock-user"}))
    }
}
