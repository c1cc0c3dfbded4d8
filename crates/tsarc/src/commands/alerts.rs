//! `tsarc alerts`: which of a model's dependents carry alerts

use tsarc_core::archive::inspect_alerts;
use tsarc_core::{AlertStatus, MetadataApi};

use super::{GlobalArgs, connect, parse_guid};
use crate::error::CliError;
use crate::output::{self, DependentAlert, OutputFormat};

/// Arguments for the `alerts` command
pub struct AlertsArgs {
    /// Model GUID
    pub model_guid: String,
}

/// Handle the `alerts` command
pub async fn handle_alerts(global: &GlobalArgs, args: &AlertsArgs) -> Result<(), CliError> {
    let model_guid = parse_guid(&args.model_guid)?;
    let (_, client) = connect(global).await?;

    let rows = dependent_alerts(&client, &model_guid).await?;
    let overall = overall_status(rows.iter().map(|r| r.status));

    match global.format {
        OutputFormat::Json => output::print_json(&serde_json::json!({
            "model_id": model_guid,
            "status": overall,
            "dependents": rows,
        }))?,
        OutputFormat::Table => output::print_dependent_alerts(&rows, overall),
    }
    Ok(())
}

/// Inspect every dependent of a model for alerts
async fn dependent_alerts<A: MetadataApi + ?Sized>(
    api: &A,
    model_guid: &str,
) -> Result<Vec<DependentAlert>, CliError> {
    let dependents = api.fetch_dependents(model_guid).await?;
    let mut rows = Vec::with_capacity(dependents.len());
    for dependent in dependents {
        let status = inspect_alerts(api, std::slice::from_ref(&dependent)).await;
        rows.push(DependentAlert { dependent, status });
    }
    Ok(rows)
}

/// Model verdict from per-dependent results
fn overall_status(statuses: impl Iterator<Item = AlertStatus>) -> AlertStatus {
    let mut overall = AlertStatus::NoAlertsFound;
    for status in statuses {
        match status {
            AlertStatus::AlertFound => return AlertStatus::AlertFound,
            AlertStatus::Unknown => overall = AlertStatus::Unknown,
            AlertStatus::NoAlertsFound => {}
        }
    }
    overall
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsarc_core::{ApiError, Dependent, LogicalTable, MockMetadataApi};

    #[tokio::test]
    async fn test_dependent_alerts() {
        let mut api = MockMetadataApi::new()
            .with_model(LogicalTable::new("m-1", "Sales"))
            .with_dependent("m-1", Dependent::new("a-1", "Quiet", "QUESTION_ANSWER_BOOK"))
            .with_dependent("m-1", Dependent::new("a-2", "Watched", "QUESTION_ANSWER_BOOK"))
            .with_alert("a-2");
        api.authenticate("u", "p", 60).await.unwrap();

        let rows = dependent_alerts(&api, "m-1").await.unwrap();
        let statuses: Vec<AlertStatus> = rows.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![AlertStatus::NoAlertsFound, AlertStatus::AlertFound]
        );
    }

    #[tokio::test]
    async fn test_dependent_alerts_unknown_model() {
        let mut api = MockMetadataApi::new();
        api.authenticate("u", "p", 60).await.unwrap();

        let err = dependent_alerts(&api, "missing").await.unwrap_err();
        assert!(matches!(err, CliError::Api(ApiError::NotFound(_))));
        assert!(!api.calls().iter().any(|c| c.starts_with("export_tml")));
    }

    #[test]
    fn test_overall_status() {
        use AlertStatus::{AlertFound, NoAlertsFound, Unknown};

        assert_eq!(overall_status([].into_iter()), NoAlertsFound);
        assert_eq!(overall_status([NoAlertsFound, Unknown].into_iter()), Unknown);
        assert_eq!(
            overall_status([Unknown, AlertFound, NoAlertsFound].into_iter()),
            AlertFound
        );
    }
}
