use serde_json::{json, Map};

use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::DatabaseManager;

pub async fn handle(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = super::postgres_pool(config).await?;
    DatabaseManager::migrate(&pool).await?;

    let target = config.database.url.as_deref().map(DatabaseManager::redact).unwrap_or_default();
    let mut details = Map::new();
    details.insert("database".into(), json!(target));
    println!("{}", output_format.render_success("Migrations applied", details));
    Ok(())
}
