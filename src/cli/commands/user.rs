use clap::Subcommand;
use serde_json::{json, Map};

use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::models::NewUser;
use crate::database::{PgStore, SocialStore};

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create a user account")]
    Add {
        #[arg(help = "Unique username")]
        username: String,
        #[arg(long, help = "Email address (defaults to <username>@localhost)")]
        email: Option<String>,
    },
}

pub async fn handle(cmd: UserCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        UserCommands::Add { username, email } => {
            let store = PgStore::new(super::postgres_pool(config).await?);
            let email = email.unwrap_or_else(|| format!("{}@localhost", username));

            let user = store.create_user(NewUser { username, email }).await?;
            tracing::info!(user_id = user.id, "user created");

            let message = format!("Created user '{}' with id {}", user.username, user.id);
            let mut details = Map::new();
            details.insert("user".into(), json!(user));
            println!("{}", output_format.render_success(&message, details));
            Ok(())
        }
    }
}
