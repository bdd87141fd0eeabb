//! Load the demo catalog and customers into `PostgreSQL`.
//!
//! Safe to re-run: products whose article already exists are skipped.

use boutique_storefront::db::{PgStore, Store};
use boutique_storefront::seed::seed_demo;

use super::{CommandError, connect};

/// Seed demo data.
///
/// # Errors
///
/// Returns `CommandError` if the database URL is missing, the connection
/// fails, or an insert fails.
pub async fn demo() -> Result<(), CommandError> {
    let pool = connect().await?;
    let store = Store::Postgres(PgStore::new(pool));

    let report = seed_demo(&store).await?;

    tracing::info!(
        created = report.products_created,
        existing = report.products_existing,
        "Demo data seeded"
    );
    Ok(())
}
