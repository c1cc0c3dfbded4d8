//! Archive pipeline tests against the in-memory platform

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;
use tsarc_core::archive::{
    ArchiveConfig, ArchiveExecutor, ArchiveManifest, ArchiveReport, ArchiveStage, Exclusion,
    MANIFEST_FILE, OutcomeStatus, PERMISSIONS_FILE, inspect_sample,
};
use tsarc_core::{
    AlertStatus, ApiError, Dependent, EdocFormat, LogicalTable, MetadataApi, MockMetadataApi,
};

const USAGE_TABLE: &str = "usage-table";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn model(id: &str, age_days: i64) -> LogicalTable {
    LogicalTable::new(id, format!("Model {id}"))
        .with_author("analyst")
        .with_created(now() - Duration::days(age_days))
}

fn answer(id: &str) -> Dependent {
    Dependent::new(id, format!("Answer {id}"), "QUESTION_ANSWER_BOOK")
}

/// One model per exclusion reason, plus two that should be archived
async fn platform() -> MockMetadataApi {
    let mut api = MockMetadataApi::new()
        .with_model(model("unused", 200))
        .with_dependent("unused", answer("d-unused"))
        .with_permissions("unused", serde_json::json!({"principals": ["analysts"]}))
        .with_model(model("recent", 10))
        .with_dependent("recent", answer("d-recent"))
        .with_model(LogicalTable::new("undated", "Model undated"))
        .with_model(model("busy", 365))
        .with_dependent("busy", answer("d-busy"))
        .with_impressions("d-busy", 5)
        .with_model(model("alerted", 365))
        .with_dependent("alerted", answer("d-quiet"))
        .with_dependent("alerted", answer("d-alert"))
        .with_alert("d-alert")
        .with_model(model("unmeasured", 365))
        .with_dependent("unmeasured", answer("d-unmeasured"))
        .failing_impressions("d-unmeasured")
        .with_model(model("uninspectable", 365))
        .with_dependent("uninspectable", answer("d-uninspectable"))
        .failing_export("d-uninspectable")
        .with_model(model("orphan", 120))
        .with_model(model("unlisted", 365))
        .failing_dependents("unlisted");
    api.authenticate("admin", "secret", 3600).await.unwrap();
    api
}

async fn run(api: &MockMetadataApi, config: ArchiveConfig) -> ArchiveReport {
    ArchiveExecutor::new(api, config, USAGE_TABLE)
        .unwrap()
        .with_now(now())
        .run()
        .await
        .unwrap()
}

fn ready_set(report: &ArchiveReport) -> BTreeSet<String> {
    report.ready.iter().map(|c| c.model.id.clone()).collect()
}

fn exclusion_of<'a>(report: &'a ArchiveReport, id: &str) -> &'a Exclusion {
    report
        .excluded
        .iter()
        .find(|c| c.model.id == id)
        .and_then(|c| c.exclusion.as_ref())
        .unwrap_or_else(|| panic!("{id} was not excluded"))
}

#[tokio::test]
async fn test_dry_run_selects_stale_models() {
    let api = platform().await;
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("archive");

    let report = run(
        &api,
        ArchiveConfig::new().with_output_dir(&out).with_dry_run(true),
    )
    .await;

    assert_eq!(report.models_scanned, 9);
    assert_eq!(
        ready_set(&report),
        BTreeSet::from(["orphan".to_string(), "unused".to_string()])
    );
    assert_eq!(report.excluded.len(), 7);

    assert_eq!(exclusion_of(&report, "recent"), &Exclusion::TooRecent);
    assert_eq!(exclusion_of(&report, "undated"), &Exclusion::TooRecent);
    assert_eq!(
        exclusion_of(&report, "busy"),
        &Exclusion::InUse {
            total_impressions: 5
        }
    );
    assert_eq!(exclusion_of(&report, "alerted"), &Exclusion::HasAlert);
    assert_eq!(
        exclusion_of(&report, "unmeasured"),
        &Exclusion::InUse {
            total_impressions: 1
        }
    );
    assert_eq!(
        exclusion_of(&report, "uninspectable"),
        &Exclusion::AlertCheckFailed
    );
    assert!(matches!(
        exclusion_of(&report, "unlisted"),
        Exclusion::DependentsUnavailable { .. }
    ));

    assert!(report.outcomes.iter().all(|o| o.status == OutcomeStatus::Planned));
    assert!(report.manifest.is_none());
    assert!(!out.exists());
}

#[tokio::test]
async fn test_ready_models_have_no_alerts_and_no_usage() {
    let api = platform().await;
    let report = run(&api, ArchiveConfig::new().with_dry_run(true)).await;

    for candidate in &report.ready {
        assert!(candidate.is_ready());
        assert_eq!(candidate.alert_status, Some(AlertStatus::NoAlertsFound));
        assert_eq!(candidate.total_impressions, Some(0));
    }
    let orphan = report.ready.iter().find(|c| c.model.id == "orphan").unwrap();
    assert!(orphan.dependents.is_empty());
}

#[tokio::test]
async fn test_stage_snapshots() {
    let api = platform().await;
    let mut seen = Vec::new();

    let report = ArchiveExecutor::new(&api, ArchiveConfig::new().with_dry_run(true), USAGE_TABLE)
        .unwrap()
        .with_now(now())
        .run_with(|stage, candidates| seen.push((stage, candidates.len())))
        .await
        .unwrap();

    assert_eq!(
        seen,
        vec![
            (ArchiveStage::ListModels, 9),
            (ArchiveStage::FilterAge, 7),
            (ArchiveStage::Dependents, 6),
            (ArchiveStage::Impressions, 6),
            (ArchiveStage::FilterImpressions, 4),
            (ArchiveStage::Alerts, 4),
            (ArchiveStage::Ready, 2),
        ]
    );
    assert_eq!(report.stages.len(), 7);
    assert_eq!(report.stages[6].model_ids.len(), 2);
}

#[tokio::test]
async fn test_archive_writes_exports_permissions_and_manifest() {
    let api = platform().await;
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("archive");

    let report = run(&api, ArchiveConfig::new().with_output_dir(&out)).await;
    assert_eq!(report.archived_count(), 2);

    let unused = out.join("unused");
    let tml = std::fs::read_to_string(unused.join("unused.tml")).unwrap();
    assert!(tml.contains("\"unused\""));
    let permissions: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(unused.join(PERMISSIONS_FILE)).unwrap())
            .unwrap();
    assert_eq!(permissions["principals"][0], "analysts");

    // No permissions for the orphan: archived with a warning
    let orphan = report
        .outcomes
        .iter()
        .find(|o| o.model_id == "orphan")
        .unwrap();
    assert!(orphan.is_archived());
    assert_eq!(orphan.warnings.len(), 1);
    assert!(!out.join("orphan").join(PERMISSIONS_FILE).exists());

    let manifest_path = report.manifest.clone().unwrap();
    assert_eq!(manifest_path, out.join(MANIFEST_FILE));
    let manifest: ArchiveManifest =
        serde_json::from_str(&std::fs::read_to_string(&manifest_path).unwrap()).unwrap();
    assert_eq!(manifest.generated_at, now());
    assert_eq!(manifest.criteria.min_age_days, 90);
    let ids: BTreeSet<&str> = manifest.models.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, BTreeSet::from(["orphan", "unused"]));

    let entry = manifest.models.iter().find(|m| m.id == "unused").unwrap();
    assert_eq!(entry.dependent_ids, vec!["d-unused".to_string()]);
    assert_eq!(entry.author.as_deref(), Some("analyst"));
}

#[tokio::test]
async fn test_export_failure_does_not_abort_run() {
    let mut api = MockMetadataApi::new()
        .with_model(model("broken", 200))
        .failing_export("broken")
        .with_model(model("fine", 200));
    api.authenticate("admin", "secret", 3600).await.unwrap();

    let temp = TempDir::new().unwrap();
    let report = run(
        &api,
        ArchiveConfig::new()
            .with_output_dir(temp.path())
            .with_permissions(false),
    )
    .await;

    assert_eq!(report.outcomes.len(), 2);
    let broken = report
        .outcomes
        .iter()
        .find(|o| o.model_id == "broken")
        .unwrap();
    assert!(matches!(broken.status, OutcomeStatus::Failed { .. }));
    assert_eq!(report.failures().count(), 1);
    assert_eq!(report.archived_count(), 1);
    assert!(temp.path().join("fine").join("fine.tml").exists());

    let manifest: ArchiveManifest = serde_json::from_str(
        &std::fs::read_to_string(temp.path().join(MANIFEST_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(manifest.models.len(), 1);
    assert_eq!(manifest.models[0].id, "fine");
}

#[tokio::test]
async fn test_export_without_documents_is_not_archived() {
    let mut api = MockMetadataApi::new()
        .with_model(model("empty", 200))
        .erroring_export("empty")
        .with_permissions("empty", serde_json::json!({"permissions": []}));
    api.authenticate("admin", "secret", 3600).await.unwrap();

    let temp = TempDir::new().unwrap();
    let report = run(&api, ArchiveConfig::new().with_output_dir(temp.path())).await;

    let outcome = &report.outcomes[0];
    assert!(matches!(outcome.status, OutcomeStatus::Failed { .. }));
    assert!(outcome.files.is_empty());
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(report.archived_count(), 0);
    assert!(!temp.path().join("empty").exists());
    assert!(!api.calls().iter().any(|c| c.starts_with("fetch_permissions")));

    let manifest: ArchiveManifest = serde_json::from_str(
        &std::fs::read_to_string(temp.path().join(MANIFEST_FILE)).unwrap(),
    )
    .unwrap();
    assert!(manifest.models.is_empty());
}

#[tokio::test]
async fn test_model_without_dependents_metadata_is_excluded() {
    let mut api = MockMetadataApi::new()
        .with_model(model("gone", 365))
        .vanishing_model("gone")
        .with_model(model("kept", 365));
    api.authenticate("admin", "secret", 3600).await.unwrap();

    let report = run(&api, ArchiveConfig::new().with_dry_run(true)).await;

    assert_eq!(ready_set(&report), BTreeSet::from(["kept".to_string()]));
    match exclusion_of(&report, "gone") {
        Exclusion::DependentsUnavailable { message } => {
            assert_eq!(message, "No metadata found for model gone");
        }
        other => panic!("unexpected exclusion {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_model_dependents_not_found() {
    let mut api = MockMetadataApi::new()
        .with_model(model("lonely", 365))
        .with_model(model("parent", 365))
        .with_dependent("parent", answer("child"));
    api.authenticate("admin", "secret", 3600).await.unwrap();

    assert!(api.fetch_dependents("lonely").await.unwrap().is_empty());
    assert_eq!(api.fetch_dependents("parent").await.unwrap().len(), 1);
    assert!(matches!(
        api.fetch_dependents("nowhere").await,
        Err(ApiError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_filters_are_monotonic() {
    let api = platform().await;

    let ready_for = |days: u32, threshold: u64| {
        let api = &api;
        async move {
            let config = ArchiveConfig::new()
                .with_min_age_days(days)
                .with_impression_threshold(threshold)
                .with_dry_run(true);
            ready_set(&run(api, config).await)
        }
    };

    let mut previous: Option<BTreeSet<String>> = None;
    for days in [0, 30, 90, 150, 300, 400] {
        let current = ready_for(days, 1).await;
        if let Some(prev) = &previous {
            assert!(current.is_subset(prev), "raising days to {days} grew the set");
        }
        previous = Some(current);
    }

    let mut previous: Option<BTreeSet<String>> = None;
    for threshold in [10, 6, 5, 2, 1, 0] {
        let current = ready_for(90, threshold).await;
        if let Some(prev) = &previous {
            assert!(
                current.is_subset(prev),
                "lowering threshold to {threshold} grew the set"
            );
        }
        previous = Some(current);
    }
}

#[tokio::test]
async fn test_higher_threshold_admits_used_model() {
    let api = platform().await;
    let report = run(
        &api,
        ArchiveConfig::new()
            .with_impression_threshold(6)
            .with_dry_run(true),
    )
    .await;

    let ready = ready_set(&report);
    assert!(ready.contains("busy"));
    // A failed lookup counts as the full threshold
    assert!(!ready.contains("unmeasured"));
    assert_eq!(
        exclusion_of(&report, "unmeasured"),
        &Exclusion::InUse {
            total_impressions: 6
        }
    );
}

#[tokio::test]
async fn test_undated_model_never_archived() {
    let api = platform().await;
    let report = run(&api, ArchiveConfig::new().with_min_age_days(0).with_dry_run(true)).await;

    assert!(!ready_set(&report).contains("undated"));
    assert_eq!(exclusion_of(&report, "undated"), &Exclusion::TooRecent);
}

#[tokio::test]
async fn test_model_listing_pages() {
    let api = platform().await;
    let report = run(
        &api,
        ArchiveConfig::new().with_record_size(4).with_dry_run(true),
    )
    .await;

    assert_eq!(report.models_scanned, 9);
    let pages: Vec<String> = api
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("search_models"))
        .collect();
    assert_eq!(
        pages,
        vec!["search_models:0", "search_models:4", "search_models:8"]
    );
}

#[tokio::test]
async fn test_sample_is_independent_of_filters() {
    let api = platform().await;

    let strict = run(&api, ArchiveConfig::new().with_min_age_days(1000).with_dry_run(true)).await;
    let strict_sample = inspect_sample(&api, "unused", EdocFormat::Json).await;
    let loose = run(
        &api,
        ArchiveConfig::new()
            .with_min_age_days(0)
            .with_impression_threshold(100)
            .with_dry_run(true),
    )
    .await;
    let loose_sample = inspect_sample(&api, "unused", EdocFormat::Json).await;

    assert!(strict.ready.is_empty());
    assert!(!loose.ready.is_empty());
    assert_eq!(strict_sample.exports, loose_sample.exports);
    assert_eq!(strict_sample.permissions, loose_sample.permissions);
    assert!(strict_sample.is_complete());
}

#[tokio::test]
async fn test_listing_failure_aborts() {
    let api = MockMetadataApi::new().with_model(model("m", 200));
    let err = ArchiveExecutor::new(&api, ArchiveConfig::new(), USAGE_TABLE)
        .unwrap()
        .run()
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("Listing models failed"));
}

#[tokio::test]
async fn test_rejected_login() {
    let mut api = MockMetadataApi::new().rejecting_login();
    let err = api.authenticate("admin", "wrong", 3600).await.unwrap_err();
    assert!(matches!(err, ApiError::Authentication(_)));
}
