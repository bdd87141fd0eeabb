//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! boutique-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! Embedded at build time from `crates/storefront/migrations/`.

use super::{CommandError, connect};

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns `CommandError` if the database URL is missing, the connection
/// fails, or a migration fails to apply.
pub async fn storefront() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
