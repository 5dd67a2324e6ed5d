pub mod migrate;
pub mod ping;
pub mod token;
pub mod user;

use sqlx::PgPool;

use crate::config::{AppConfig, StorageBackend};
use crate::database::DatabaseManager;

/// Commands that touch persistent data only make sense against Postgres
pub(crate) async fn postgres_pool(config: &AppConfig) -> anyhow::Result<PgPool> {
    if config.database.backend != StorageBackend::Postgres {
        anyhow::bail!("this command needs STORAGE_BACKEND=postgres (the memory store lives inside the server process)");
    }
    Ok(DatabaseManager::connect(&config.database).await?)
}
