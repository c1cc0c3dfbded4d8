//! `tsarc dependents`: a model's dependents and their impressions

use tracing::warn;
use tsarc_core::MetadataApi;

use super::{GlobalArgs, connect, parse_guid};
use crate::error::CliError;
use crate::output::{self, DependentUsage, OutputFormat};

/// Arguments for the `dependents` command
pub struct DependentsArgs {
    /// Model GUID
    pub model_guid: String,
    /// Impression window in days
    pub lookback_days: u32,
}

/// Handle the `dependents` command
pub async fn handle_dependents(global: &GlobalArgs, args: &DependentsArgs) -> Result<(), CliError> {
    let model_guid = parse_guid(&args.model_guid)?;
    let (settings, client) = connect(global).await?;
    let table_id = settings.require_logical_table_id()?;

    let rows = dependent_usage(&client, table_id, &model_guid, args.lookback_days).await?;

    match global.format {
        OutputFormat::Json => output::print_json(&rows)?,
        OutputFormat::Table => output::print_dependent_usage(&rows, args.lookback_days),
    }
    Ok(())
}

/// Look up the impressions of every dependent of a model
async fn dependent_usage<A: MetadataApi + ?Sized>(
    api: &A,
    table_id: &str,
    model_guid: &str,
    lookback_days: u32,
) -> Result<Vec<DependentUsage>, CliError> {
    let dependents = api.fetch_dependents(model_guid).await?;
    let mut rows = Vec::with_capacity(dependents.len());
    for dependent in dependents {
        let lookup = api
            .count_impressions(table_id, &dependent.id, lookback_days)
            .await;
        let (impressions, error) = match lookup {
            Ok(count) => (Some(count), None),
            Err(e) => {
                warn!(dependent_id = %dependent.id, error = %e, "Impression lookup failed");
                (None, Some(e.to_string()))
            }
        };
        rows.push(DependentUsage {
            dependent,
            impressions,
            error,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsarc_core::{ApiError, Dependent, LogicalTable, MockMetadataApi};

    #[tokio::test]
    async fn test_dependent_usage() {
        let mut api = MockMetadataApi::new()
            .with_model(LogicalTable::new("m-1", "Sales"))
            .with_dependent("m-1", Dependent::new("a-1", "Used", "QUESTION_ANSWER_BOOK"))
            .with_dependent("m-1", Dependent::new("a-2", "Broken", "PINBOARD_ANSWER_BOOK"))
            .with_impressions("a-1", 12)
            .failing_impressions("a-2");
        api.authenticate("u", "p", 60).await.unwrap();

        let rows = dependent_usage(&api, "usage", "m-1", 30).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].impressions, Some(12));
        assert!(rows[0].error.is_none());
        assert_eq!(rows[1].impressions, None);
        assert!(rows[1].error.is_some());
    }

    #[tokio::test]
    async fn test_dependent_usage_unknown_model() {
        let mut api = MockMetadataApi::new();
        api.authenticate("u", "p", 60).await.unwrap();

        let err = dependent_usage(&api, "usage", "missing", 30).await.unwrap_err();
        assert!(matches!(err, CliError::Api(ApiError::NotFound(_))));
        assert!(!api.calls().iter().any(|c| c.starts_with("count_impressions")));
    }
}
