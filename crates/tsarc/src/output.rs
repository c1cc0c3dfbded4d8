//! Output formatting for CLI

use clap::ValueEnum;
use serde::Serialize;
use tsarc_core::archive::{ArchiveReport, ArchiveStage, Candidate, OutcomeStatus, SampleReport};
use tsarc_core::{AlertStatus, Dependent, LogicalTable};

use crate::error::CliError;

/// How command results are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text tables
    #[default]
    Table,
    /// A single JSON document on stdout
    Json,
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render rows as a left-aligned table with a header rule
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&line(headers.to_vec()));
    out.push('\n');
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&line(rule.iter().map(String::as_str).collect()));
    out.push('\n');
    for row in rows {
        out.push_str(&line(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    out
}

/// Creation date of a model, or `-`
pub fn format_created(model: &LogicalTable) -> String {
    model
        .created()
        .map(|c| c.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn stage_title(stage: ArchiveStage) -> &'static str {
    match stage {
        ArchiveStage::ListModels => "All models",
        ArchiveStage::FilterAge => "Models older than the cutoff",
        ArchiveStage::Dependents => "Models with dependents",
        ArchiveStage::Impressions => "Impressions per model",
        ArchiveStage::FilterImpressions => "Models under the impression threshold",
        ArchiveStage::Alerts => "Alert status per model",
        ArchiveStage::Ready => "Models ready for archiving",
    }
}

fn model_rows(models: &[&LogicalTable]) -> Vec<Vec<String>> {
    models
        .iter()
        .map(|m| {
            vec![
                m.id.clone(),
                m.name.clone(),
                m.author.clone().unwrap_or_else(|| "-".to_string()),
                format_created(m),
            ]
        })
        .collect()
}

/// Print the survivors of one archive stage
pub fn print_stage(stage: ArchiveStage, candidates: &[Candidate]) {
    println!(
        "Step {}: {} ({})",
        stage.number(),
        stage_title(stage),
        candidates.len()
    );

    if candidates.is_empty() {
        println!("  none");
        println!();
        return;
    }

    let table = match stage {
        ArchiveStage::ListModels | ArchiveStage::FilterAge | ArchiveStage::Ready => {
            let models: Vec<&LogicalTable> = candidates.iter().map(|c| &c.model).collect();
            render_table(&["ID", "NAME", "AUTHOR", "CREATED"], &model_rows(&models))
        }
        ArchiveStage::Dependents => {
            let rows: Vec<Vec<String>> = candidates
                .iter()
                .map(|c| {
                    vec![
                        c.model.id.clone(),
                        c.model.name.clone(),
                        c.dependents.len().to_string(),
                    ]
                })
                .collect();
            render_table(&["ID", "NAME", "DEPENDENTS"], &rows)
        }
        ArchiveStage::Impressions | ArchiveStage::FilterImpressions => {
            let rows: Vec<Vec<String>> = candidates
                .iter()
                .map(|c| {
                    vec![
                        c.model.id.clone(),
                        c.model.name.clone(),
                        c.total_impressions
                            .map(|t| t.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        c.impression_failures.to_string(),
                    ]
                })
                .collect();
            render_table(&["ID", "NAME", "IMPRESSIONS", "FAILED LOOKUPS"], &rows)
        }
        ArchiveStage::Alerts => {
            let rows: Vec<Vec<String>> = candidates
                .iter()
                .map(|c| {
                    vec![
                        c.model.id.clone(),
                        c.model.name.clone(),
                        c.alert_status
                            .map(|s| s.label().to_string())
                            .unwrap_or_else(|| "-".to_string()),
                    ]
                })
                .collect();
            render_table(&["ID", "NAME", "ALERTS"], &rows)
        }
    };
    print!("{}", table);
    println!();
}

/// Print the archive results and exclusions
pub fn print_report(report: &ArchiveReport) {
    if !report.excluded.is_empty() {
        println!("Excluded models ({})", report.excluded.len());
        let rows: Vec<Vec<String>> = report
            .excluded
            .iter()
            .map(|c| {
                vec![
                    c.model.id.clone(),
                    c.model.name.clone(),
                    c.exclusion
                        .as_ref()
                        .map(|e| e.describe())
                        .unwrap_or_default(),
                ]
            })
            .collect();
        print!("{}", render_table(&["ID", "NAME", "REASON"], &rows));
        println!();
    }

    if !report.outcomes.is_empty() {
        println!("Archive results");
        let rows: Vec<Vec<String>> = report
            .outcomes
            .iter()
            .map(|o| {
                let status = match &o.status {
                    OutcomeStatus::Archived => format!("archived ({} files)", o.files.len()),
                    OutcomeStatus::Planned => "planned".to_string(),
                    OutcomeStatus::Failed { error } => format!("failed: {}", error),
                };
                vec![o.model_id.clone(), o.model_name.clone(), status]
            })
            .collect();
        print!("{}", render_table(&["ID", "NAME", "STATUS"], &rows));
        for outcome in &report.outcomes {
            for warning in &outcome.warnings {
                eprintln!("Warning ({}): {}", outcome.model_id, warning);
            }
        }
        println!();
    }

    println!("Scanned:  {}", report.models_scanned);
    println!("Ready:    {}", report.ready.len());
    if report.dry_run {
        println!("Dry run:  nothing written");
    } else {
        println!("Archived: {}", report.archived_count());
    }
    if let Some(manifest) = &report.manifest {
        println!("Manifest: {}", manifest.display());
    }
    println!("Duration: {}ms", report.duration_ms);
}

/// Print the sample preview
pub fn print_sample(sample: &SampleReport) -> Result<(), CliError> {
    println!();
    println!("Sample object {}", sample.guid);

    match (&sample.permissions, &sample.permissions_error) {
        (Some(permissions), _) => {
            println!("Permissions:");
            println!("{}", serde_json::to_string_pretty(permissions)?);
        }
        (None, Some(error)) => println!("Permissions: unavailable ({})", error),
        (None, None) => println!("Permissions: none"),
    }

    if let Some(error) = &sample.export_error {
        println!("Export: failed ({})", error);
    } else {
        for export in &sample.exports {
            println!(
                "Export: {} [{}]",
                export.filename.as_deref().unwrap_or("-"),
                export.status.as_deref().unwrap_or("-")
            );
            if let Some(edoc) = &export.edoc {
                println!("{}", edoc);
            }
        }
    }
    Ok(())
}

/// Print a list of models
pub fn print_models(models: &[LogicalTable]) {
    let refs: Vec<&LogicalTable> = models.iter().collect();
    print!(
        "{}",
        render_table(&["ID", "NAME", "AUTHOR", "CREATED"], &model_rows(&refs))
    );
    println!();
    println!("{} models", models.len());
}

/// A dependent with its impression lookup result
#[derive(Debug, Serialize)]
pub struct DependentUsage {
    #[serde(flatten)]
    pub dependent: Dependent,
    pub impressions: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Print dependents with their impressions
pub fn print_dependent_usage(rows: &[DependentUsage], lookback_days: u32) {
    let table: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.dependent.id.clone(),
                r.dependent.name.clone(),
                r.dependent.kind.clone(),
                r.impressions
                    .map(|i| i.to_string())
                    .unwrap_or_else(|| "error".to_string()),
            ]
        })
        .collect();
    print!(
        "{}",
        render_table(&["ID", "NAME", "TYPE", "IMPRESSIONS"], &table)
    );
    let total: u64 = rows.iter().filter_map(|r| r.impressions).sum();
    println!();
    println!(
        "{} dependents, {} impressions in the last {} days",
        rows.len(),
        total,
        lookback_days
    );
}

/// A dependent with its alert inspection result
#[derive(Debug, Serialize)]
pub struct DependentAlert {
    #[serde(flatten)]
    pub dependent: Dependent,
    pub status: AlertStatus,
}

/// Print per-dependent alert status and the model verdict
pub fn print_dependent_alerts(rows: &[DependentAlert], overall: AlertStatus) {
    let table: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.dependent.id.clone(),
                r.dependent.name.clone(),
                r.dependent.kind.clone(),
                r.status.label().to_string(),
            ]
        })
        .collect();
    print!("{}", render_table(&["ID", "NAME", "TYPE", "ALERTS"], &table));
    println!();
    println!("Model: {}", overall);
}
