//! Archive run configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::metadata::EdocFormat;

/// Thresholds that decide whether a model is stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleCriteria {
    /// Minimum model age in days
    pub min_age_days: u32,
    /// Impression window in days
    pub lookback_days: u32,
    /// Models need strictly fewer impressions than this
    pub impression_threshold: u64,
}

impl Default for StaleCriteria {
    fn default() -> Self {
        Self {
            min_age_days: 90,
            lookback_days: 90,
            impression_threshold: 1,
        }
    }
}

/// Main archive configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Stale-model thresholds
    pub criteria: StaleCriteria,
    /// Page size for model listing
    pub record_size: u32,
    /// Directory receiving exported TML and the manifest
    pub output_dir: PathBuf,
    /// Format of exported documents
    pub export_format: EdocFormat,
    /// Store sharing permissions next to each export
    pub include_permissions: bool,
    /// Report what would be archived without writing anything
    pub dry_run: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            criteria: StaleCriteria::default(),
            record_size: 100_000,
            output_dir: PathBuf::from("archive"),
            export_format: EdocFormat::Json,
            include_permissions: true,
            dry_run: false,
        }
    }
}

impl ArchiveConfig {
    /// Create a new archive config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum model age
    pub fn with_min_age_days(mut self, days: u32) -> Self {
        self.criteria.min_age_days = days;
        self
    }

    /// Set the impression lookback window
    pub fn with_lookback_days(mut self, days: u32) -> Self {
        self.criteria.lookback_days = days;
        self
    }

    /// Set the impression threshold
    pub fn with_impression_threshold(mut self, threshold: u64) -> Self {
        self.criteria.impression_threshold = threshold;
        self
    }

    /// Set the listing page size
    pub fn with_record_size(mut self, record_size: u32) -> Self {
        self.record_size = record_size;
        self
    }

    /// Set the output directory
    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    /// Set the export document format
    pub fn with_export_format(mut self, format: EdocFormat) -> Self {
        self.export_format = format;
        self
    }

    /// Enable or disable permission snapshots
    pub fn with_permissions(mut self, include: bool) -> Self {
        self.include_permissions = include;
        self
    }

    /// Enable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.record_size == 0 {
            return Err("record size must be at least 1".to_string());
        }
        if self.criteria.lookback_days == 0 {
            return Err("lookback window must be at least 1 day".to_string());
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err("output directory must not be empty".to_string());
        }
        Ok(())
    }
}
