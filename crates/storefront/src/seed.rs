//! Demo catalog and customers.
//!
//! Loaded into the in-memory store on startup and into `PostgreSQL` by
//! `boutique-cli seed`. Seeding is idempotent: existing articles and
//! customers are left alone.

use tracing::{debug, info};

use boutique_core::{Money, UserId};

use crate::db::{RepositoryError, Store};
use crate::models::NewProduct;

/// Number of dresses in the demo catalog.
const DEMO_DRESS_COUNT: i64 = 5;

/// Customers created by [`seed_demo`]: `(id, display name)`.
pub const DEMO_CUSTOMERS: [(i32, &str); 2] = [(1, "Demo customer"), (2, "Demo VIP")];

/// Products created by [`seed_demo`].
#[must_use]
pub fn demo_catalog() -> Vec<NewProduct> {
    (1..=DEMO_DRESS_COUNT)
        .map(|i| NewProduct {
            article: format!("VOGUE{i:03}"),
            name: format!("Exclusive dress {i}"),
            category: "Dresses".to_string(),
            price: Money::from_units(25_000 + i * 5_000),
            stock: 10,
            image_url: Some(format!("/static/images/dress-{i}.jpg")),
        })
        .collect()
}

/// What [`seed_demo`] created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub products_created: usize,
    pub products_existing: usize,
}

/// Load the demo catalog and customers.
///
/// # Errors
///
/// Returns `RepositoryError` if the store fails for a reason other than an
/// existing article.
pub async fn seed_demo(store: &Store) -> Result<SeedReport, RepositoryError> {
    let mut report = SeedReport::default();

    for product in demo_catalog() {
        let article = product.article.clone();
        match store.insert_product(product).await {
            Ok(created) => {
                debug!(article = %created.article, id = %created.id, "Seeded product");
                report.products_created += 1;
            }
            Err(RepositoryError::Conflict(_)) => {
                debug!(article = %article, "Product already present");
                report.products_existing += 1;
            }
            Err(e) => return Err(e),
        }
    }

    for (id, name) in DEMO_CUSTOMERS {
        store.ensure_customer(UserId::new(id), name).await?;
    }

    info!(
        backend = store.backend(),
        created = report.products_created,
        existing = report.products_existing,
        "Demo data loaded"
    );
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[test]
    fn test_demo_prices_step_by_five_thousand() {
        let prices: Vec<String> = demo_catalog()
            .iter()
            .map(|p| p.price.to_string())
            .collect();
        assert_eq!(prices, ["30000", "35000", "40000", "45000", "50000"]);
    }

    #[tokio::test]
    async fn test_seeding_twice_is_harmless() {
        let store = Store::Memory(MemoryStore::new());

        let first = seed_demo(&store).await.unwrap();
        let second = seed_demo(&store).await.unwrap();

        assert_eq!(first.products_created, 5);
        assert_eq!(second.products_created, 0);
        assert_eq!(second.products_existing, 5);
        assert_eq!(store.active_products().await.unwrap().len(), 5);
        assert!(store.get_customer(UserId::new(1)).await.unwrap().is_some());
    }
}
