//! CLI command implementations.

pub mod migrate;
pub mod seed;

use sqlx::PgPool;
use thiserror::Error;

use boutique_storefront::config::{ConfigError, database_url_from_env};
use boutique_storefront::db;

/// Errors shared by the database commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Seeding failed: {0}")]
    Seed(#[from] db::RepositoryError),
}

/// Connect to the storefront database named by the environment.
async fn connect() -> Result<PgPool, CommandError> {
    let database_url = database_url_from_env()?;
    tracing::info!("Connecting to storefront database...");
    Ok(db::create_pool(&database_url).await?)
}
