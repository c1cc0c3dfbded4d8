//! tsarc - archive stale models from a ThoughtSpot-style platform

mod commands;
mod error;
mod logging;
mod output;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tsarc_core::EdocFormat;
use tsarc_core::api::DEFAULT_TIMEOUT_SECS;

use commands::GlobalArgs;
use commands::alerts::{AlertsArgs, handle_alerts};
use commands::archive::{ArchiveArgs, handle_archive};
use commands::dependents::{DependentsArgs, handle_dependents};
use commands::models::{ModelsArgs, handle_models};
use commands::session::handle_session;
use error::CliError;
use output::OutputFormat;

const DEFAULT_RECORD_SIZE: u32 = 100_000;

#[derive(Parser)]
#[command(name = "tsarc")]
#[command(about = "Find stale models and archive their TML", long_about = None)]
#[command(version)]
struct Cli {
    /// Environment file with TS_SERVER_URL, TS_USERNAME, TS_PASSWORD, ...
    #[arg(long, global = true, default_value = ".env")]
    env_file: PathBuf,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find stale models and archive them
    Archive {
        /// Archive models created more than this many days ago
        #[arg(long, default_value_t = 90)]
        days: u32,

        /// Impression window in days
        #[arg(long, default_value_t = 90)]
        lookback_days: u32,

        /// Archive models with fewer impressions than this
        #[arg(long, default_value_t = 1)]
        imp_threshold: u64,

        /// Page size when listing models
        #[arg(long, default_value_t = DEFAULT_RECORD_SIZE)]
        record_size: u32,

        /// Directory receiving the archived TML
        #[arg(long, default_value = "archive")]
        output_dir: PathBuf,

        /// Format of the archived TML
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        export_format: ExportFormat,

        /// Do not store sharing permissions next to each export
        #[arg(long)]
        no_permissions: bool,

        /// Show what would be archived without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Skip the TS_SAMPLE_GUID permissions preview and export
        #[arg(long)]
        skip_sample: bool,
    },

    /// List every model
    Models {
        /// Page size when listing models
        #[arg(long, default_value_t = DEFAULT_RECORD_SIZE)]
        record_size: u32,
    },

    /// Show a model's dependents and their impressions
    Dependents {
        /// Model GUID
        #[arg(long)]
        model_guid: String,

        /// Impression window in days
        #[arg(long, default_value_t = 90)]
        days: u32,
    },

    /// Show which of a model's dependents carry alerts
    Alerts {
        /// Model GUID
        #[arg(long)]
        model_guid: String,
    },

    /// Show the logged-in user
    Session,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportFormat {
    Json,
    Yaml,
}

impl From<ExportFormat> for EdocFormat {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Json => EdocFormat::Json,
            ExportFormat::Yaml => EdocFormat::Yaml,
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let global = GlobalArgs {
        env_file: cli.env_file,
        timeout: cli.timeout,
        format: cli.format,
    };

    match cli.command {
        Commands::Archive {
            days,
            lookback_days,
            imp_threshold,
            record_size,
            output_dir,
            export_format,
            no_permissions,
            dry_run,
            skip_sample,
        } => {
            let args = ArchiveArgs {
                days,
                lookback_days,
                imp_threshold,
                record_size,
                output_dir,
                export_format: export_format.into(),
                no_permissions,
                dry_run,
                skip_sample,
            };
            handle_archive(&global, &args).await
        }
        Commands::Models { record_size } => {
            handle_models(&global, &ModelsArgs { record_size }).await
        }
        Commands::Dependents { model_guid, days } => {
            let args = DependentsArgs {
                model_guid,
                lookback_days: days,
            };
            handle_dependents(&global, &args).await
        }
        Commands::Alerts { model_guid } => handle_alerts(&global, &AlertsArgs { model_guid }).await,
        Commands::Session => handle_session(&global).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e.user_message());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_archive_defaults() {
        let cli = Cli::try_parse_from(["tsarc", "archive"]).unwrap();
        assert_eq!(cli.env_file, PathBuf::from(".env"));
        assert_eq!(cli.timeout, DEFAULT_TIMEOUT_SECS);
        assert_eq!(cli.format, OutputFormat::Table);

        match cli.command {
            Commands::Archive {
                days,
                lookback_days,
                imp_threshold,
                record_size,
                output_dir,
                dry_run,
                skip_sample,
                ..
            } => {
                assert_eq!(days, 90);
                assert_eq!(lookback_days, 90);
                assert_eq!(imp_threshold, 1);
                assert_eq!(record_size, 100_000);
                assert_eq!(output_dir, PathBuf::from("archive"));
                assert!(!dry_run);
                assert!(!skip_sample);
            }
            _ => panic!("expected archive"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tsarc",
            "dependents",
            "--model-guid",
            "abc",
            "--days",
            "30",
            "--format",
            "json",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(
            cli.command,
            Commands::Dependents { days: 30, .. }
        ));
    }

    #[test]
    fn test_alerts_requires_model_guid() {
        assert!(Cli::try_parse_from(["tsarc", "alerts"]).is_err());
    }
}
