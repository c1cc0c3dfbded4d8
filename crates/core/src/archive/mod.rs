//! Stale model archiving
//!
//! The archive run is a single sequential pass:
//!
//! 1. **List**: page through every logical table
//! 2. **Age**: keep models created before `now - min_age_days`
//! 3. **Dependents**: attach the objects built on each model
//! 4. **Impressions**: total the dependents' impressions over the lookback window
//! 5. **Usage**: keep models under the impression threshold
//! 6. **Alerts**: inspect every dependent's associated TML for an alert
//! 7. **Archive**: export ready models, their permissions and a manifest
//!
//! # Example
//!
//! ```rust,ignore
//! use tsarc_core::archive::{ArchiveConfig, ArchiveExecutor};
//!
//! let config = ArchiveConfig::new()
//!     .with_min_age_days(180)
//!     .with_output_dir("archive")
//!     .with_dry_run(true);
//!
//! let executor = ArchiveExecutor::new(&client, config, usage_table_id)?;
//! let report = executor.run().await?;
//! println!("{} models ready", report.ready.len());
//! ```
//!
//! Lookups that fail for a single dependent never let a model through: a
//! failed impression count adds the threshold to the total and a failed alert
//! inspection yields `AlertStatus::Unknown`.

mod config;
mod error;
mod executor;
mod filter;
mod sample;
mod writer;

pub use config::{ArchiveConfig, StaleCriteria};
pub use error::{ArchiveError, ArchiveResult};
pub use executor::{
    ArchiveExecutor, ArchiveReport, ArchiveStage, StageSnapshot, inspect_alerts, list_models,
};
pub use filter::{Candidate, Exclusion, age_cutoff, below_threshold, is_old, is_stale};
pub use sample::{SampleReport, export_sample, inspect_sample, preview_permissions};
pub use writer::{
    ArchiveManifest, ArchiveOutcome, ArchiveWriter, MANIFEST_FILE, ManifestEntry, OutcomeStatus,
    PERMISSIONS_FILE, safe_file_name,
};
