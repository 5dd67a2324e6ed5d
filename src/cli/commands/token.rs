use clap::Subcommand;
use serde_json::{json, Map};

use crate::auth::JwtKeys;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Mint an access token for a user id")]
    Issue {
        #[arg(help = "User id the token is issued for")]
        user_id: i64,
    },
}

pub async fn handle(cmd: TokenCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Issue { user_id } => {
            if crate::is_production!() {
                anyhow::bail!("token issue is a development helper and is disabled in production");
            }

            let keys = JwtKeys::from_config(&config.security)?;
            let token = keys.issue(user_id)?;

            match output_format {
                OutputFormat::Json => {
                    let mut details = Map::new();
                    details.insert("user_id".into(), json!(user_id));
                    details.insert("token".into(), json!(token));
                    details.insert("expires_in_hours".into(), json!(config.security.jwt_expiry_hours));
                    println!("{}", output_format.render_success("Token issued", details));
                }
                // Bare token so it can be captured by shell scripts
                OutputFormat::Text => println!("{}", token),
            }
            Ok(())
        }
    }
}
