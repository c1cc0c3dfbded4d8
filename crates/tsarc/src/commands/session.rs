//! `tsarc session`: show the logged-in user

use tsarc_core::MetadataApi;

use super::{GlobalArgs, connect};
use crate::error::CliError;
use crate::output::{self, OutputFormat};

/// Handle the `session` command
pub async fn handle_session(global: &GlobalArgs) -> Result<(), CliError> {
    let (settings, client) = connect(global).await?;
    let user = client.session_user().await?;

    if global.format == OutputFormat::Table {
        let field = |key: &str| {
            user.get(key)
                .and_then(|v| v.as_str())
                .unwrap_or("-")
                .to_string()
        };
        println!("Server:       {}", settings.server_url);
        println!("User:         {}", field("name"));
        println!("Display name: {}", field("display_name"));
        println!("Email:        {}", field("email"));
        if let Some(org) = user.get("current_org") {
            println!(
                "Org:          {}",
                org.get("name").and_then(|v| v.as_str()).unwrap_or("-")
            );
        }
        return Ok(());
    }

    output::print_json(&user)
}
