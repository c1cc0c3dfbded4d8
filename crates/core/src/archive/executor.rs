//! Archive executor for running the stale-model pipeline

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, info, info_span, warn};

use super::config::{ArchiveConfig, StaleCriteria};
use super::error::{ArchiveError, ArchiveResult};
use super::filter::{Candidate, Exclusion, age_cutoff, below_threshold, is_old};
use super::writer::{ArchiveOutcome, ArchiveWriter};
use crate::api::MetadataApi;
use crate::metadata::{AlertStatus, Dependent, ExportOptions, LogicalTable};
use crate::usage::alert_in_export;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveStage {
    /// All models listed
    ListModels,
    /// Models older than the cutoff
    FilterAge,
    /// Dependents attached
    Dependents,
    /// Impression totals attached
    Impressions,
    /// Models under the impression threshold
    FilterImpressions,
    /// Alert status attached
    Alerts,
    /// Models ready for archiving
    Ready,
}

impl ArchiveStage {
    /// All stages, in order
    pub const ALL: [ArchiveStage; 7] = [
        ArchiveStage::ListModels,
        ArchiveStage::FilterAge,
        ArchiveStage::Dependents,
        ArchiveStage::Impressions,
        ArchiveStage::FilterImpressions,
        ArchiveStage::Alerts,
        ArchiveStage::Ready,
    ];

    /// Get stage name
    pub fn name(&self) -> &'static str {
        match self {
            ArchiveStage::ListModels => "list_models",
            ArchiveStage::FilterAge => "filter_age",
            ArchiveStage::Dependents => "dependents",
            ArchiveStage::Impressions => "impressions",
            ArchiveStage::FilterImpressions => "filter_impressions",
            ArchiveStage::Alerts => "alerts",
            ArchiveStage::Ready => "ready",
        }
    }

    /// 1-based position
    pub fn number(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0) + 1
    }
}

/// Models that survived one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSnapshot {
    pub stage: ArchiveStage,
    pub model_ids: Vec<String>,
}

/// Outcome of an archive run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveReport {
    /// Reference time used for the age cutoff
    pub run_at: DateTime<Utc>,
    /// Thresholds applied
    pub criteria: StaleCriteria,
    /// Number of models listed
    pub models_scanned: usize,
    /// Survivors of each stage, in order
    pub stages: Vec<StageSnapshot>,
    /// Models that passed every filter
    pub ready: Vec<Candidate>,
    /// Models filtered out, with the reason
    pub excluded: Vec<Candidate>,
    /// Per-model archive results
    pub outcomes: Vec<ArchiveOutcome>,
    /// Manifest location, unless dry run
    pub manifest: Option<std::path::PathBuf>,
    /// Whether nothing was written
    pub dry_run: bool,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl ArchiveReport {
    /// Number of models written to disk
    pub fn archived_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_archived()).count()
    }

    /// Outcomes that failed to export
    pub fn failures(&self) -> impl Iterator<Item = &ArchiveOutcome> {
        self.outcomes.iter().filter(|o| !o.is_archived() && !self.dry_run)
    }
}

/// Runs the stale-model pipeline against a platform
pub struct ArchiveExecutor<'a, A: MetadataApi + ?Sized> {
    api: &'a A,
    config: ArchiveConfig,
    logical_table_id: String,
    now: DateTime<Utc>,
}

impl<'a, A: MetadataApi + ?Sized> ArchiveExecutor<'a, A> {
    /// Create a new executor.
    ///
    /// `api` must already be authenticated. `logical_table_id` is the
    /// usage-statistics table queried for impressions.
    pub fn new(
        api: &'a A,
        config: ArchiveConfig,
        logical_table_id: impl Into<String>,
    ) -> ArchiveResult<Self> {
        config.validate().map_err(ArchiveError::ConfigError)?;
        let logical_table_id = logical_table_id.into();
        if logical_table_id.trim().is_empty() {
            return Err(ArchiveError::ConfigError(
                "usage logical table id must not be empty".to_string(),
            ));
        }
        Ok(Self {
            api,
            config,
            logical_table_id,
            now: Utc::now(),
        })
    }

    /// Use a fixed reference time instead of the current time
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Run the pipeline
    pub async fn run(&self) -> ArchiveResult<ArchiveReport> {
        self.run_with(|_, _| {}).await
    }

    /// Run the pipeline, calling `on_stage` with the surviving candidates
    /// after each stage
    pub async fn run_with<F>(&self, on_stage: F) -> ArchiveResult<ArchiveReport>
    where
        F: FnMut(ArchiveStage, &[Candidate]),
    {
        let span = info_span!("archive_run", dry_run = self.config.dry_run);
        self.execute(on_stage).instrument(span).await
    }

    async fn execute<F>(&self, mut on_stage: F) -> ArchiveResult<ArchiveReport>
    where
        F: FnMut(ArchiveStage, &[Candidate]),
    {
        let mut stages = Vec::with_capacity(ArchiveStage::ALL.len());
        let mut record = |stage: ArchiveStage, active: &[Candidate]| {
            stages.push(StageSnapshot {
                stage,
                model_ids: active.iter().map(|c| c.model.id.clone()).collect(),
            });
            on_stage(stage, active);
        };

        let start = Instant::now();
        let criteria = self.config.criteria;

        info!(
            min_age_days = criteria.min_age_days,
            lookback_days = criteria.lookback_days,
            impression_threshold = criteria.impression_threshold,
            dry_run = self.config.dry_run,
            "Starting archive run"
        );

        let models = list_models(self.api, self.config.record_size).await?;
        let models_scanned = models.len();
        let mut active: Vec<Candidate> = models.into_iter().map(Candidate::new).collect();
        let mut excluded = Vec::new();
        record(ArchiveStage::ListModels, &active);

        let cutoff = age_cutoff(self.now, criteria.min_age_days);
        debug!(cutoff = %cutoff, "Applying age filter");
        active = retain(active, &mut excluded, |c| {
            (!is_old(&c.model, cutoff)).then_some(Exclusion::TooRecent)
        });
        record(ArchiveStage::FilterAge, &active);

        for candidate in &mut active {
            match self.api.fetch_dependents(&candidate.model.id).await {
                Ok(dependents) => candidate.dependents = dependents,
                Err(e) => {
                    warn!(model_id = %candidate.model.id, error = %e, "Failed to list dependents");
                    candidate.exclusion = Some(Exclusion::DependentsUnavailable {
                        message: e.to_string(),
                    });
                }
            }
        }
        active = retain(active, &mut excluded, |c| c.exclusion.clone());
        record(ArchiveStage::Dependents, &active);

        for candidate in &mut active {
            let (total, failures) = self
                .total_impressions(&candidate.dependents, criteria)
                .await;
            candidate.total_impressions = Some(total);
            candidate.impression_failures = failures;
        }
        record(ArchiveStage::Impressions, &active);

        active = retain(active, &mut excluded, |c| {
            let total = c.total_impressions.unwrap_or(u64::MAX);
            (!below_threshold(total, criteria.impression_threshold)).then_some(Exclusion::InUse {
                total_impressions: total,
            })
        });
        record(ArchiveStage::FilterImpressions, &active);

        for candidate in &mut active {
            candidate.alert_status = Some(self.alert_status(&candidate.dependents).await);
        }
        record(ArchiveStage::Alerts, &active);

        active = retain(active, &mut excluded, |c| match c.alert_status {
            Some(AlertStatus::NoAlertsFound) => None,
            Some(AlertStatus::AlertFound) => Some(Exclusion::HasAlert),
            _ => Some(Exclusion::AlertCheckFailed),
        });
        record(ArchiveStage::Ready, &active);

        info!(
            scanned = models_scanned,
            ready = active.len(),
            excluded = excluded.len(),
            "Filtering complete"
        );

        let writer = ArchiveWriter::new(&self.config);
        let mut outcomes = Vec::with_capacity(active.len());
        for candidate in &active {
            outcomes.push(writer.archive(self.api, candidate).await?);
        }
        let manifest = writer
            .write_manifest(self.now, criteria, &active, &outcomes)
            .await?;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            archived = outcomes.iter().filter(|o| o.is_archived()).count(),
            duration_ms, "Archive run completed"
        );

        Ok(ArchiveReport {
            run_at: self.now,
            criteria,
            models_scanned,
            stages,
            ready: active,
            excluded,
            outcomes,
            manifest,
            dry_run: self.config.dry_run,
            duration_ms,
        })
    }

    /// Sum impressions over all dependents.
    ///
    /// A failed lookup counts as `impression_threshold` impressions so the
    /// model cannot pass the threshold filter.
    async fn total_impressions(
        &self,
        dependents: &[Dependent],
        criteria: StaleCriteria,
    ) -> (u64, usize) {
        let mut total: u64 = 0;
        let mut failures = 0;

        for dependent in dependents {
            let count = match self
                .api
                .count_impressions(&self.logical_table_id, &dependent.id, criteria.lookback_days)
                .await
            {
                Ok(count) => count,
                Err(e) => {
                    warn!(
                        dependent_id = %dependent.id,
                        error = %e,
                        "Impression lookup failed, assuming threshold"
                    );
                    failures += 1;
                    criteria.impression_threshold
                }
            };
            total = total.saturating_add(count);
        }

        (total, failures)
    }

    /// Inspect every dependent's associated TML for an alert
    async fn alert_status(&self, dependents: &[Dependent]) -> AlertStatus {
        inspect_alerts(self.api, dependents).await
    }
}

/// List every model, one page of `page_size` at a time
pub async fn list_models<A: MetadataApi + ?Sized>(
    api: &A,
    page_size: u32,
) -> ArchiveResult<Vec<LogicalTable>> {
    if page_size == 0 {
        return Err(ArchiveError::ConfigError(
            "record size must be at least 1".to_string(),
        ));
    }

    let mut models = Vec::new();
    let mut offset: u32 = 0;

    loop {
        let page = api
            .search_models(offset, page_size)
            .await
            .map_err(|e| ArchiveError::api("Listing models", e))?;
        let fetched = page.fetched;
        models.extend(page.models);
        debug!(offset, fetched, "Fetched model page");

        if fetched < page_size as usize {
            break;
        }
        offset = match offset.checked_add(page_size) {
            Some(next) => next,
            None => break,
        };
    }

    info!(count = models.len(), "Retrieved models");
    Ok(models)
}

/// Check dependents for alerts.
///
/// Stops at the first alert. An inspection failure makes the result
/// `Unknown` unless a later dependent has an alert.
pub async fn inspect_alerts<A: MetadataApi + ?Sized>(
    api: &A,
    dependents: &[Dependent],
) -> AlertStatus {
    let mut status = AlertStatus::NoAlertsFound;

    for dependent in dependents {
        match api
            .export_tml(&dependent.id, ExportOptions::associated())
            .await
        {
            Ok(items) if alert_in_export(&items) => {
                debug!(dependent_id = %dependent.id, "Alert found");
                return AlertStatus::AlertFound;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(dependent_id = %dependent.id, error = %e, "Failed to inspect dependent");
                status = AlertStatus::Unknown;
            }
        }
    }

    status
}

/// Split candidates into survivors and excluded ones
fn retain<F>(active: Vec<Candidate>, excluded: &mut Vec<Candidate>, mut verdict: F) -> Vec<Candidate>
where
    F: FnMut(&Candidate) -> Option<Exclusion>,
{
    let mut kept = Vec::with_capacity(active.len());
    for candidate in active {
        match verdict(&candidate) {
            Some(reason) => excluded.push(candidate.exclude(reason)),
            None => kept.push(candidate),
        }
    }
    kept
}
