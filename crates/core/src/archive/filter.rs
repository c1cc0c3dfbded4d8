//! Stale-model predicates
//!
//! A model is stale when it is older than the age cutoff, its dependents drew
//! fewer impressions than the threshold, and no dependent carries an alert.
//! All comparisons are strict, so each filter is monotonic in its threshold.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::config::StaleCriteria;
use crate::metadata::{AlertStatus, Dependent, LogicalTable};

/// Creation time a model must predate to count as old
pub fn age_cutoff(now: DateTime<Utc>, min_age_days: u32) -> DateTime<Utc> {
    now - Duration::days(i64::from(min_age_days))
}

/// Whether the model was created before `cutoff`.
///
/// Models without a creation time are never old.
pub fn is_old(model: &LogicalTable, cutoff: DateTime<Utc>) -> bool {
    model.created().is_some_and(|created| created < cutoff)
}

/// Whether an impression total is under the threshold
pub fn below_threshold(total: u64, threshold: u64) -> bool {
    total < threshold
}

/// The full stale predicate
pub fn is_stale(
    model: &LogicalTable,
    cutoff: DateTime<Utc>,
    total_impressions: u64,
    criteria: &StaleCriteria,
    alert_status: AlertStatus,
) -> bool {
    is_old(model, cutoff)
        && below_threshold(total_impressions, criteria.impression_threshold)
        && alert_status == AlertStatus::NoAlertsFound
}

/// Why a model was kept out of the archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Exclusion {
    /// Created after the cutoff, or no creation time
    TooRecent,
    /// Dependents could not be listed
    DependentsUnavailable { message: String },
    /// Impression total reached the threshold
    InUse { total_impressions: u64 },
    /// A dependent has an alert
    HasAlert,
    /// A dependent could not be inspected for alerts
    AlertCheckFailed,
}

impl Exclusion {
    /// Short description for reports
    pub fn describe(&self) -> String {
        match self {
            Exclusion::TooRecent => "too recent".to_string(),
            Exclusion::DependentsUnavailable { message } => {
                format!("dependents unavailable: {}", message)
            }
            Exclusion::InUse { total_impressions } => {
                format!("{} impressions", total_impressions)
            }
            Exclusion::HasAlert => "alert on a dependent".to_string(),
            Exclusion::AlertCheckFailed => "alert check failed".to_string(),
        }
    }
}

/// A model moving through the archive stages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub model: LogicalTable,
    /// Filled in by the dependents stage
    pub dependents: Vec<Dependent>,
    /// Filled in by the impressions stage
    pub total_impressions: Option<u64>,
    /// Dependents whose impression lookup failed
    pub impression_failures: usize,
    /// Filled in by the alert stage
    pub alert_status: Option<AlertStatus>,
    /// Set when the model leaves the pipeline
    pub exclusion: Option<Exclusion>,
}

impl Candidate {
    /// Wrap a freshly listed model
    pub fn new(model: LogicalTable) -> Self {
        Self {
            model,
            dependents: Vec::new(),
            total_impressions: None,
            impression_failures: 0,
            alert_status: None,
            exclusion: None,
        }
    }

    /// Mark the candidate as excluded
    pub fn exclude(mut self, exclusion: Exclusion) -> Self {
        self.exclusion = Some(exclusion);
        self
    }

    /// Whether every stage has passed the candidate
    pub fn is_ready(&self) -> bool {
        self.exclusion.is_none() && self.alert_status == Some(AlertStatus::NoAlertsFound)
    }
}
