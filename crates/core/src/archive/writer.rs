//! Writes exported models to the archive directory
//!
//! Layout:
//!
//! ```text
//! <output_dir>/
//!   manifest.json
//!   <model guid>/
//!     <exported file>.tml
//!     permissions.json
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::{ArchiveConfig, StaleCriteria};
use super::error::{ArchiveError, ArchiveResult};
use super::filter::Candidate;
use crate::api::MetadataApi;
use crate::metadata::{ExportOptions, TmlExport};

/// Manifest file name
pub const MANIFEST_FILE: &str = "manifest.json";

/// Permissions snapshot file name
pub const PERMISSIONS_FILE: &str = "permissions.json";

/// Longest file name written to disk
const MAX_FILE_NAME: usize = 200;

/// What happened to one ready model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Files written
    Archived,
    /// Dry run, nothing written
    Planned,
    /// Export failed
    Failed { error: String },
}

/// Result of archiving one model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveOutcome {
    pub model_id: String,
    pub model_name: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
    /// Files written, relative to the output directory
    pub files: Vec<PathBuf>,
    /// Non-fatal problems (permissions unavailable, export warnings)
    pub warnings: Vec<String>,
}

impl ArchiveOutcome {
    fn new(candidate: &Candidate, status: OutcomeStatus) -> Self {
        Self {
            model_id: candidate.model.id.clone(),
            model_name: candidate.model.name.clone(),
            status,
            files: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Whether the model made it to disk
    pub fn is_archived(&self) -> bool {
        matches!(self.status, OutcomeStatus::Archived)
    }
}

/// Manifest entry per archived model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    pub name: String,
    pub author: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub total_impressions: Option<u64>,
    pub dependent_ids: Vec<String>,
    pub files: Vec<PathBuf>,
}

/// Summary written next to the exports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveManifest {
    pub generated_at: DateTime<Utc>,
    pub criteria: StaleCriteria,
    pub models: Vec<ManifestEntry>,
}

/// Exports ready models and writes them under the output directory
pub struct ArchiveWriter {
    output_dir: PathBuf,
    options: ExportOptions,
    include_permissions: bool,
    dry_run: bool,
}

impl ArchiveWriter {
    /// Create a writer from the archive configuration
    pub fn new(config: &ArchiveConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            options: ExportOptions {
                export_associated: false,
                edoc_format: config.export_format,
            },
            include_permissions: config.include_permissions,
            dry_run: config.dry_run,
        }
    }

    /// Output directory
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Export one model and write its files.
    ///
    /// API failures are recorded in the outcome; only local IO errors abort.
    pub async fn archive<A: MetadataApi + ?Sized>(
        &self,
        api: &A,
        candidate: &Candidate,
    ) -> ArchiveResult<ArchiveOutcome> {
        let model_id = candidate.model.id.as_str();

        if self.dry_run {
            debug!(model_id = %model_id, "Dry run, skipping export");
            return Ok(ArchiveOutcome::new(candidate, OutcomeStatus::Planned));
        }

        let exports = match api.export_tml(model_id, self.options).await {
            Ok(exports) => exports,
            Err(e) => {
                warn!(model_id = %model_id, error = %e, "TML export failed");
                return Ok(ArchiveOutcome::new(
                    candidate,
                    OutcomeStatus::Failed {
                        error: e.to_string(),
                    },
                ));
            }
        };

        let mut warnings = Vec::new();
        let mut documents = Vec::new();
        for (idx, export) in exports.iter().enumerate() {
            if export.is_error() {
                warnings.push(format!(
                    "export of {} reported an error",
                    export.name.as_deref().unwrap_or(model_id)
                ));
                continue;
            }
            if let Some(edoc) = export.edoc.as_deref() {
                documents.push((export_file_name(export, idx), edoc));
            }
        }

        if documents.is_empty() {
            warn!(model_id = %model_id, "Export returned no TML documents");
            let mut outcome = ArchiveOutcome::new(
                candidate,
                OutcomeStatus::Failed {
                    error: "export returned no TML documents".to_string(),
                },
            );
            outcome.warnings = warnings;
            return Ok(outcome);
        }

        let mut outcome = ArchiveOutcome::new(candidate, OutcomeStatus::Archived);
        outcome.warnings = warnings;
        let model_dir = PathBuf::from(safe_file_name(model_id, "model"));
        self.create_dir(&model_dir).await?;

        for (file_name, edoc) in documents {
            let rel = model_dir.join(file_name);
            self.write(&rel, edoc.as_bytes()).await?;
            outcome.files.push(rel);
        }

        if self.include_permissions {
            match api.fetch_permissions(model_id).await {
                Ok(permissions) => {
                    let rel = model_dir.join(PERMISSIONS_FILE);
                    let body = serde_json::to_vec_pretty(&permissions)?;
                    self.write(&rel, &body).await?;
                    outcome.files.push(rel);
                }
                Err(e) => {
                    warn!(model_id = %model_id, error = %e, "Permissions unavailable");
                    outcome
                        .warnings
                        .push(format!("permissions unavailable: {}", e));
                }
            }
        }

        info!(model_id = %model_id, files = outcome.files.len(), "Model archived");
        Ok(outcome)
    }

    /// Write `manifest.json` describing the archived models.
    ///
    /// Returns the manifest path, or `None` in dry-run mode.
    pub async fn write_manifest(
        &self,
        generated_at: DateTime<Utc>,
        criteria: StaleCriteria,
        ready: &[Candidate],
        outcomes: &[ArchiveOutcome],
    ) -> ArchiveResult<Option<PathBuf>> {
        if self.dry_run {
            return Ok(None);
        }

        let models = ready
            .iter()
            .filter_map(|candidate| {
                let outcome = outcomes
                    .iter()
                    .find(|o| o.model_id == candidate.model.id && o.is_archived())?;
                Some(ManifestEntry {
                    id: candidate.model.id.clone(),
                    name: candidate.model.name.clone(),
                    author: candidate.model.author.clone(),
                    created: candidate.model.created(),
                    total_impressions: candidate.total_impressions,
                    dependent_ids: candidate.dependents.iter().map(|d| d.id.clone()).collect(),
                    files: outcome.files.clone(),
                })
            })
            .collect();

        let manifest = ArchiveManifest {
            generated_at,
            criteria,
            models,
        };

        self.create_dir(Path::new("")).await?;
        let body = serde_json::to_vec_pretty(&manifest)?;
        self.write(Path::new(MANIFEST_FILE), &body).await?;
        Ok(Some(self.output_dir.join(MANIFEST_FILE)))
    }

    async fn create_dir(&self, rel: &Path) -> ArchiveResult<()> {
        let path = self.output_dir.join(rel);
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| ArchiveError::io(&path, e))
    }

    async fn write(&self, rel: &Path, content: &[u8]) -> ArchiveResult<()> {
        let path = self.output_dir.join(rel);
        debug!(path = %path.display(), bytes = content.len(), "Writing archive file");
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| ArchiveError::io(&path, e))
    }
}

/// File name for one exported document
fn export_file_name(export: &TmlExport, idx: usize) -> String {
    let fallback = match export.id.as_deref() {
        Some(id) => format!("{}.tml", id),
        None => format!("export-{}.tml", idx),
    };
    match export.filename.as_deref() {
        Some(name) => safe_file_name(name, &fallback),
        None => safe_file_name(&fallback, "export.tml"),
    }
}

/// Make a platform-supplied name safe to use as a single path component.
///
/// Separators and control characters become `_`, leading dots are dropped and
/// the result is capped at `MAX_FILE_NAME` bytes.
pub fn safe_file_name(name: &str, fallback: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.');

    if cleaned.is_empty() {
        return fallback.to_string();
    }

    let mut end = cleaned.len().min(MAX_FILE_NAME);
    while !cleaned.is_char_boundary(end) {
        end -= 1;
    }
    cleaned[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("Sales.worksheet.tml", "x"), "Sales.worksheet.tml");
        assert_eq!(safe_file_name("../../etc/passwd", "x"), "_.._etc_passwd");
        assert_eq!(safe_file_name("a/b\\c:d", "x"), "a_b_c_d");
        assert_eq!(safe_file_name("..", "fallback"), "fallback");
        assert_eq!(safe_file_name("   ", "fallback"), "fallback");
        assert_eq!(safe_file_name(".hidden", "x"), "hidden");

        let long = "é".repeat(150);
        let safe = safe_file_name(&long, "x");
        assert!(safe.len() <= MAX_FILE_NAME);
        assert!(safe.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_export_file_name_fallbacks() {
        let mut export = TmlExport {
            filename: None,
            id: Some("abc".to_string()),
            name: None,
            object_type: None,
            status: None,
            edoc: None,
        };
        assert_eq!(export_file_name(&export, 0), "abc.tml");

        export.id = None;
        assert_eq!(export_file_name(&export, 3), "export-3.tml");

        export.filename = Some("/".to_string());
        assert_eq!(export_file_name(&export, 3), "_");
    }
}
