//! Usage signals: impression counts and alert detection

use crate::api::types::SearchDataResponse;
use crate::metadata::TmlExport;

/// Column holding the impression count in a search data result
pub const IMPRESSIONS_COLUMN: &str = "Number of Impressions";

/// File name the platform gives an exported alert definition
pub const ALERTS_FILENAME: &str = "alerts.tml";

/// Search query counting impressions of one object over the last `lookback_days`
pub fn impressions_query(dependent_id: &str, lookback_days: u32) -> String {
    format!(
        "[Answer Book GUID] = '{}' count [Impressions] [Timestamp].'last {} days' max [Timestamp]",
        dependent_id.replace('\'', ""),
        lookback_days
    )
}

/// Extract the impression count from a COMPACT search data response.
///
/// An empty result counts as zero. When rows are present, a missing
/// `Number of Impressions` column or a cell that is not a non-negative number
/// is an error, so the caller can treat the lookup as failed.
pub fn parse_impression_count(response: &SearchDataResponse) -> Result<u64, String> {
    let Some(content) = response.contents.first() else {
        return Ok(0);
    };
    let Some(row) = content.data_rows.first() else {
        return Ok(0);
    };
    let idx = content
        .column_names
        .iter()
        .position(|c| c == IMPRESSIONS_COLUMN)
        .ok_or_else(|| format!("column '{}' missing from result", IMPRESSIONS_COLUMN))?;

    let cell = row
        .get(idx)
        .ok_or_else(|| format!("row has no value for column '{}'", IMPRESSIONS_COLUMN))?;
    cell_to_count(cell).ok_or_else(|| format!("'{}' is not an impression count", cell))
}

fn cell_to_count(cell: &serde_json::Value) -> Option<u64> {
    match cell {
        serde_json::Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.round() as u64)
        }),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Whether an associated-objects export contains an alert definition
pub fn alert_in_export(items: &[TmlExport]) -> bool {
    items.iter().any(|item| {
        item.filename
            .as_deref()
            .is_some_and(|name| name.to_lowercase() == ALERTS_FILENAME)
    })
}
