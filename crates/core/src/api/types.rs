//! Request and response bodies for the REST API v2

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::metadata::{Dependent, ExportOptions, LOGICAL_TABLE, LogicalTable, TmlExport};

/// Request body for `/auth/token/full`
#[derive(Debug, Serialize)]
pub(crate) struct TokenRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub validity_time_in_sec: u64,
}

/// Response from `/auth/token/full`
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub token: String,
}

/// Object selector used by several endpoints
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub(crate) struct MetadataSelector {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub metadata_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

impl MetadataSelector {
    pub fn identifier(guid: &str) -> Self {
        Self {
            metadata_type: None,
            identifier: Some(guid.to_string()),
        }
    }
}

/// Request body for `/metadata/search`
#[derive(Debug, Serialize)]
pub(crate) struct MetadataSearchRequest {
    pub metadata: Vec<MetadataSelector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_details: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_headers: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_dependent_objects: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependent_object_version: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_auto_created_objects: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependent_objects_record_size: Option<u32>,
    pub record_offset: u32,
    pub record_size: u32,
}

/// Maximum number of dependents requested per model
pub(crate) const DEPENDENT_RECORD_SIZE: u32 = 1000;

impl MetadataSearchRequest {
    /// All logical tables, one page
    pub fn models(record_offset: u32, record_size: u32) -> Self {
        Self {
            metadata: vec![MetadataSelector {
                metadata_type: Some(LOGICAL_TABLE.to_string()),
                identifier: None,
            }],
            include_details: Some(true),
            include_headers: None,
            include_dependent_objects: None,
            dependent_object_version: None,
            include_auto_created_objects: None,
            dependent_objects_record_size: None,
            record_offset,
            record_size,
        }
    }

    /// A single logical table with its dependent objects
    pub fn dependents_of(model_id: &str) -> Self {
        Self {
            metadata: vec![MetadataSelector {
                metadata_type: Some(LOGICAL_TABLE.to_string()),
                identifier: Some(model_id.to_string()),
            }],
            include_details: Some(false),
            include_headers: Some(true),
            include_dependent_objects: Some(true),
            dependent_object_version: Some("V1"),
            include_auto_created_objects: Some(false),
            dependent_objects_record_size: Some(DEPENDENT_RECORD_SIZE),
            record_offset: 0,
            record_size: 1,
        }
    }
}

/// One item of a `/metadata/search` response
#[derive(Debug, Default, Deserialize)]
pub(crate) struct MetadataSearchItem {
    #[serde(default)]
    pub metadata_header: Option<MetadataHeader>,
    /// model GUID -> metadata type -> headers
    #[serde(default)]
    pub dependent_objects: Option<BTreeMap<String, BTreeMap<String, Vec<ObjectHeader>>>>,
}

/// Header fields of a searched object
#[derive(Debug, Default, Deserialize)]
pub(crate) struct MetadataHeader {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "authorDisplayName")]
    pub author_display_name: Option<String>,
    /// Epoch milliseconds; some versions send it as a float
    #[serde(default)]
    pub created: Option<f64>,
}

/// Header of a dependent object
#[derive(Debug, Deserialize)]
pub(crate) struct ObjectHeader {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl MetadataSearchItem {
    /// Convert to a model record; items without an id are dropped
    pub fn into_logical_table(self) -> Option<LogicalTable> {
        let header = self.metadata_header?;
        let id = header.id?;
        Some(LogicalTable {
            name: header.name.unwrap_or_default(),
            author: header.author_display_name,
            created_ms: header
                .created
                .filter(|ms| ms.is_finite())
                .map(|ms| ms as i64),
            id,
        })
    }

    /// Flatten the dependents listed for `model_id`
    pub fn dependents_of(self, model_id: &str) -> Vec<Dependent> {
        self.dependent_objects
            .and_then(|mut by_model| by_model.remove(model_id))
            .map(|by_type| {
                by_type
                    .into_iter()
                    .flat_map(|(kind, headers)| {
                        headers.into_iter().map(move |h| Dependent {
                            name: h.name.unwrap_or_else(|| "Unknown".to_string()),
                            id: h.id,
                            kind: kind.clone(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Request body for `/searchdata`
#[derive(Debug, Serialize)]
pub(crate) struct SearchDataRequest<'a> {
    pub query_string: String,
    pub logical_table_identifier: &'a str,
    pub data_format: &'static str,
    pub record_offset: u32,
    pub record_size: u32,
}

/// Response from `/searchdata`
#[derive(Debug, Default, Deserialize)]
pub struct SearchDataResponse {
    #[serde(default)]
    pub contents: Vec<SearchDataContent>,
}

/// One result set of a search data response
#[derive(Debug, Default, Deserialize)]
pub struct SearchDataContent {
    #[serde(default)]
    pub column_names: Vec<String>,
    #[serde(default)]
    pub data_rows: Vec<Vec<serde_json::Value>>,
}

/// Request body for `/metadata/tml/export`
#[derive(Debug, Serialize)]
pub(crate) struct TmlExportRequest {
    pub metadata: Vec<MetadataSelector>,
    pub export_associated: bool,
    pub export_fqn: bool,
    pub edoc_format: &'static str,
    pub export_dependent: bool,
}

impl TmlExportRequest {
    pub fn new(guid: &str, options: ExportOptions) -> Self {
        Self {
            metadata: vec![MetadataSelector::identifier(guid)],
            export_associated: options.export_associated,
            export_fqn: false,
            edoc_format: options.edoc_format.as_str(),
            export_dependent: false,
        }
    }
}

/// One item of a `/metadata/tml/export` response
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TmlExportItem {
    #[serde(default)]
    pub info: Option<TmlInfo>,
    #[serde(default)]
    pub edoc: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TmlInfo {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub object_type: Option<String>,
    #[serde(default)]
    pub status: Option<TmlStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TmlStatus {
    #[serde(default)]
    pub status_code: Option<String>,
}

impl From<TmlExportItem> for TmlExport {
    fn from(item: TmlExportItem) -> Self {
        let info = item.info.unwrap_or_default();
        TmlExport {
            filename: info.filename,
            id: info.id,
            name: info.name,
            object_type: info.object_type,
            status: info.status.and_then(|s| s.status_code),
            edoc: item.edoc,
        }
    }
}

/// Request body for `/security/metadata/fetch-permissions`
#[derive(Debug, Serialize)]
pub(crate) struct PermissionsRequest {
    pub metadata: Vec<MetadataSelector>,
}
