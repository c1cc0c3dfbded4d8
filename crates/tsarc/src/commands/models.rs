//! `tsarc models`: list every logical table

use tsarc_core::archive::list_models;

use super::{GlobalArgs, connect};
use crate::error::CliError;
use crate::output::{self, OutputFormat};

/// Arguments for the `models` command
pub struct ModelsArgs {
    /// Listing page size
    pub record_size: u32,
}

/// Handle the `models` command
pub async fn handle_models(global: &GlobalArgs, args: &ModelsArgs) -> Result<(), CliError> {
    let (_, client) = connect(global).await?;
    let models = list_models(&client, args.record_size).await?;

    match global.format {
        OutputFormat::Json => output::print_json(&models)?,
        OutputFormat::Table => output::print_models(&models),
    }
    Ok(())
}
