//! Catalog feed record.
//!
//! The storefront publishes its active catalog as a list of these records and
//! the chat bot mirrors it, so both sides agree on one shape.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::money::Money;

/// Public view of an active product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub article: String,
    pub name: String,
    pub price: Money,
    pub category: String,
    pub image_url: Option<String>,
    /// Units currently available (not counting reserved units).
    pub stock: u32,
}

/// Body of the storefront's `GET /api/products` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFeed {
    pub products: Vec<ProductSummary>,
}

impl CatalogFeed {
    /// Products in the given category, in feed order.
    pub fn in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a ProductSummary> {
        self.products.iter().filter(move |p| p.category == category)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_parses_storefront_payload() {
        let feed: CatalogFeed = serde_json::from_str(
            r#"{"products": [
                {"id": 1, "article": "VOGUE001", "name": "Exclusive dress 1",
                 "price": "30000", "category": "Dresses", "image_url": null, "stock": 10},
                {"id": 2, "article": "COAT001", "name": "Wool coat",
                 "price": "52000.50", "category": "Outerwear", "image_url": "/img/coat.jpg", "stock": 0}
            ]}"#,
        )
        .unwrap();

        assert_eq!(feed.products.len(), 2);
        let dresses: Vec<_> = feed.in_category("Dresses").map(|p| p.article.as_str()).collect();
        assert_eq!(dresses, ["VOGUE001"]);
        assert_eq!(feed.products.get(1).unwrap().price.to_string(), "52000.5");
    }
}
