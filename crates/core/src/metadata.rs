//! Metadata objects read from the platform
//!
//! These are read-only views of externally owned records. They live for a
//! single run and are never written back.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata type of a model
pub const LOGICAL_TABLE: &str = "LOGICAL_TABLE";

/// A logical table (model)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalTable {
    /// Model GUID
    pub id: String,
    /// Display name
    pub name: String,
    /// Author display name
    pub author: Option<String>,
    /// Creation time in epoch milliseconds
    pub created_ms: Option<i64>,
}

impl LogicalTable {
    /// Create a model record
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            author: None,
            created_ms: None,
        }
    }

    /// Set the author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the creation time in epoch milliseconds
    pub fn with_created_ms(mut self, created_ms: i64) -> Self {
        self.created_ms = Some(created_ms);
        self
    }

    /// Set the creation time
    pub fn with_created(self, created: DateTime<Utc>) -> Self {
        self.with_created_ms(created.timestamp_millis())
    }

    /// Creation time, if the platform reported a valid one
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created_ms
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}

/// One page of a model listing
///
/// `fetched` counts every item the platform returned, readable or not.
/// Paging compares it against the page size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelPage {
    /// Readable models on the page
    pub models: Vec<LogicalTable>,
    /// Raw number of items returned
    pub fetched: usize,
}

impl ModelPage {
    /// A page where every returned item was readable
    pub fn from_models(models: Vec<LogicalTable>) -> Self {
        Self {
            fetched: models.len(),
            models,
        }
    }
}

/// An object downstream of a model (answer, liveboard, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependent {
    /// Object GUID
    pub id: String,
    /// Display name
    pub name: String,
    /// Metadata type the platform listed it under
    pub kind: String,
}

impl Dependent {
    /// Create a dependent record
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// Result of inspecting a model's dependents for alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    /// At least one dependent has an alert
    AlertFound,
    /// No dependent has an alert
    NoAlertsFound,
    /// A dependent could not be inspected
    Unknown,
}

impl AlertStatus {
    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            AlertStatus::AlertFound => "Alert Found",
            AlertStatus::NoAlertsFound => "No Alerts Found",
            AlertStatus::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Document format for TML exports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EdocFormat {
    #[default]
    Json,
    Yaml,
}

impl EdocFormat {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            EdocFormat::Json => "JSON",
            EdocFormat::Yaml => "YAML",
        }
    }
}

/// Options for a TML export request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Also export associated objects (alerts, feedback, ...)
    pub export_associated: bool,
    /// Document format
    pub edoc_format: EdocFormat,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            export_associated: false,
            edoc_format: EdocFormat::Json,
        }
    }
}

impl ExportOptions {
    /// Options used when looking for alerts on a dependent
    pub fn associated() -> Self {
        Self {
            export_associated: true,
            ..Self::default()
        }
    }
}

/// One exported TML document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TmlExport {
    /// File name suggested by the platform (e.g. `sales.worksheet.tml`)
    pub filename: Option<String>,
    /// Exported object GUID
    pub id: Option<String>,
    /// Exported object name
    pub name: Option<String>,
    /// Exported object type
    pub object_type: Option<String>,
    /// Export status code (`OK`, `WARNING`, `ERROR`)
    pub status: Option<String>,
    /// Document body
    pub edoc: Option<String>,
}

impl TmlExport {
    /// Whether the platform reported an error for this item
    pub fn is_error(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("ERROR"))
    }
}

/// Check that a user-supplied GUID is a well-formed UUID.
///
/// Returns the canonical lowercase hyphenated form.
pub fn validate_guid(guid: &str) -> Result<String, uuid::Error> {
    Uuid::parse_str(guid.trim()).map(|u| u.hyphenated().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_conversion() {
        let model = LogicalTable::new("id", "Sales").with_created_ms(1_700_000_000_000);
        let created = model.created().unwrap();
        assert_eq!(created.timestamp(), 1_700_000_000);

        assert!(LogicalTable::new("id", "Sales").created().is_none());
    }

    #[test]
    fn test_alert_status_label() {
        assert_eq!(AlertStatus::NoAlertsFound.to_string(), "No Alerts Found");
        assert_eq!(AlertStatus::AlertFound.label(), "Alert Found");
        assert_eq!(
            serde_json::to_string(&AlertStatus::NoAlertsFound).unwrap(),
            "\"no_alerts_found\""
        );
    }

    #[test]
    fn test_validate_guid() {
        assert_eq!(
            validate_guid(" 0E2A3C3B-5E4F-4B7A-9C1D-2F3E4A5B6C7D ").unwrap(),
            "0e2a3c3b-5e4f-4b7a-9c1d-2f3e4a5b6c7d"
        );
        assert!(validate_guid("not-a-guid").is_err());
        assert!(validate_guid("../../etc/passwd").is_err());
    }

    #[test]
    fn test_export_item_error_status() {
        let item = TmlExport {
            filename: None,
            id: None,
            name: None,
            object_type: None,
            status: Some("error".to_string()),
            edoc: None,
        };
        assert!(item.is_error());
    }
}
