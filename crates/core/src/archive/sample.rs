//! Sample object preview
//!
//! Runs after the archive stages and does not depend on their thresholds.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::{ApiResult, MetadataApi};
use crate::metadata::{EdocFormat, ExportOptions, TmlExport};

/// Permissions and TML of the sample object
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SampleReport {
    pub guid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions_error: Option<String>,
    pub exports: Vec<TmlExport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_error: Option<String>,
}

impl SampleReport {
    /// Whether both requests succeeded
    pub fn is_complete(&self) -> bool {
        self.permissions_error.is_none() && self.export_error.is_none()
    }
}

/// Fetch the sharing permissions of an object
pub async fn preview_permissions<A: MetadataApi + ?Sized>(
    api: &A,
    guid: &str,
) -> ApiResult<serde_json::Value> {
    api.fetch_permissions(guid).await
}

/// Export the TML of an object without associated objects
pub async fn export_sample<A: MetadataApi + ?Sized>(
    api: &A,
    guid: &str,
    format: EdocFormat,
) -> ApiResult<Vec<TmlExport>> {
    let options = ExportOptions {
        export_associated: false,
        edoc_format: format,
    };
    api.export_tml(guid, options).await
}

/// Preview permissions and export the sample object.
///
/// Failures are recorded in the report.
pub async fn inspect_sample<A: MetadataApi + ?Sized>(
    api: &A,
    guid: &str,
    format: EdocFormat,
) -> SampleReport {
    let mut report = SampleReport {
        guid: guid.to_string(),
        ..SampleReport::default()
    };

    match preview_permissions(api, guid).await {
        Ok(permissions) => report.permissions = Some(permissions),
        Err(e) => {
            warn!(guid = %guid, error = %e, "Sample permissions preview failed");
            report.permissions_error = Some(e.to_string());
        }
    }

    match export_sample(api, guid, format).await {
        Ok(exports) => report.exports = exports,
        Err(e) => {
            warn!(guid = %guid, error = %e, "Sample export failed");
            report.export_error = Some(e.to_string());
        }
    }

    info!(guid = %guid, exports = report.exports.len(), "Sample inspected");
    report
}
