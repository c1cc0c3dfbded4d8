//! `tsarc archive`: find stale models and archive them

use std::path::PathBuf;

use serde::Serialize;
use tracing::warn;
use tsarc_core::archive::{
    ArchiveConfig, ArchiveExecutor, ArchiveReport, SampleReport, inspect_sample,
};
use tsarc_core::{EdocFormat, MetadataApi, Settings};

use super::{GlobalArgs, connect, parse_guid};
use crate::error::CliError;
use crate::output::{self, OutputFormat};

/// Arguments for the `archive` command
pub struct ArchiveArgs {
    /// Minimum model age in days
    pub days: u32,
    /// Impression window in days
    pub lookback_days: u32,
    /// Models need fewer impressions than this
    pub imp_threshold: u64,
    /// Listing page size
    pub record_size: u32,
    /// Archive directory
    pub output_dir: PathBuf,
    /// Export format of archived TML
    pub export_format: EdocFormat,
    /// Skip the permissions snapshot
    pub no_permissions: bool,
    /// Report without writing
    pub dry_run: bool,
    /// Skip the sample object preview
    pub skip_sample: bool,
}

impl ArchiveArgs {
    fn config(&self) -> ArchiveConfig {
        ArchiveConfig::new()
            .with_min_age_days(self.days)
            .with_lookback_days(self.lookback_days)
            .with_impression_threshold(self.imp_threshold)
            .with_record_size(self.record_size)
            .with_output_dir(&self.output_dir)
            .with_export_format(self.export_format)
            .with_permissions(!self.no_permissions)
            .with_dry_run(self.dry_run)
    }
}

#[derive(Serialize)]
struct ArchiveOutput<'a> {
    report: &'a ArchiveReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample: Option<&'a SampleReport>,
}

/// Handle the `archive` command
pub async fn handle_archive(global: &GlobalArgs, args: &ArchiveArgs) -> Result<(), CliError> {
    let config = args.config();
    config.validate().map_err(CliError::InvalidArgument)?;

    let (settings, client) = connect(global).await?;
    let table_id = settings.require_logical_table_id()?;
    let table = global.format == OutputFormat::Table;

    let executor = ArchiveExecutor::new(&client, config, table_id)?;
    let report = executor
        .run_with(|stage, candidates| {
            if table {
                output::print_stage(stage, candidates);
            }
        })
        .await?;

    let sample = if args.skip_sample {
        None
    } else {
        sample(&client, &settings, args.export_format).await
    };

    if table {
        output::print_report(&report);
        if let Some(sample) = &sample {
            output::print_sample(sample)?;
        }
    } else {
        output::print_json(&ArchiveOutput {
            report: &report,
            sample: sample.as_ref(),
        })?;
    }
    Ok(())
}

async fn sample<A: MetadataApi + ?Sized>(
    api: &A,
    settings: &Settings,
    format: EdocFormat,
) -> Option<SampleReport> {
    let Some(raw) = settings.sample_guid.as_deref() else {
        warn!("TS_SAMPLE_GUID is not set, skipping sample preview");
        return None;
    };
    match parse_guid(raw) {
        Ok(guid) => Some(inspect_sample(api, &guid, format).await),
        Err(e) => {
            warn!(error = %e, "Skipping sample preview");
            None
        }
    }
}
