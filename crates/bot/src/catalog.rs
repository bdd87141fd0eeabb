//! In-process mirror of the storefront catalog.
//!
//! The storefront publishes its active catalog at `GET /api/products`. The
//! mirror keeps the last good copy and a background task refreshes it on a
//! fixed period. A failed refresh is logged and the previous snapshot stays
//! in place.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument};

use boutique_core::{CatalogFeed, ProductId, ProductSummary};

/// Per-request timeout for the catalog feed.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from a catalog refresh.
#[derive(Debug, Error)]
pub enum CatalogSyncError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The storefront answered with a non-success status.
    #[error("catalog feed returned HTTP {0}")]
    Status(reqwest::StatusCode),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Shared, periodically refreshed copy of the active catalog.
#[derive(Clone)]
pub struct CatalogMirror {
    inner: Arc<CatalogMirrorInner>,
}

struct CatalogMirrorInner {
    client: reqwest::Client,
    feed_url: String,
    snapshot: RwLock<Arc<CatalogFeed>>,
}

impl CatalogMirror {
    /// Create an empty mirror of the feed at `feed_url`.
    #[must_use]
    pub fn new(feed_url: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(CatalogMirrorInner {
                client: reqwest::Client::new(),
                feed_url: feed_url.into(),
                snapshot: RwLock::new(Arc::new(CatalogFeed::default())),
            }),
        }
    }

    /// The feed URL this mirror polls.
    #[must_use]
    pub fn feed_url(&self) -> &str {
        &self.inner.feed_url
    }

    /// The current snapshot. Later refreshes do not affect it.
    pub async fn snapshot(&self) -> Arc<CatalogFeed> {
        Arc::clone(&*self.inner.snapshot.read().await)
    }

    /// Swap in a new snapshot.
    pub async fn replace(&self, feed: CatalogFeed) {
        *self.inner.snapshot.write().await = Arc::new(feed);
    }

    /// Up to `limit` products, in feed order.
    pub async fn all(&self, limit: usize) -> Vec<ProductSummary> {
        self.snapshot()
            .await
            .products
            .iter()
            .take(limit)
            .cloned()
            .collect()
    }

    /// One mirrored product.
    pub async fn get(&self, id: ProductId) -> Option<ProductSummary> {
        self.snapshot()
            .await
            .products
            .iter()
            .find(|product| product.id == id)
            .cloned()
    }

    /// Up to `limit` products in `category`, in feed order.
    pub async fn by_category(&self, category: &str, limit: usize) -> Vec<ProductSummary> {
        self.snapshot()
            .await
            .in_category(category)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Distinct categories in order of first appearance.
    pub async fn categories(&self) -> Vec<String> {
        let snapshot = self.snapshot().await;
        let mut categories: Vec<String> = Vec::new();
        for product in &snapshot.products {
            if !categories.contains(&product.category) {
                categories.push(product.category.clone());
            }
        }
        categories
    }

    /// Fetch the feed and replace the snapshot.
    ///
    /// Returns the number of products now mirrored.
    ///
    /// # Errors
    ///
    /// Returns `CatalogSyncError` if the feed cannot be fetched or parsed. The
    /// previous snapshot is kept.
    #[instrument(skip(self), fields(url = %self.inner.feed_url))]
    pub async fn refresh(&self) -> Result<usize, CatalogSyncError> {
        let response = self
            .inner
            .client
            .get(&self.inner.feed_url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogSyncError::Status(status));
        }

        let body = response.text().await?;
        let feed: CatalogFeed = serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse catalog feed"
            );
            CatalogSyncError::Parse(e)
        })?;

        let count = feed.products.len();
        self.replace(feed).await;
        debug!(count, "Catalog snapshot replaced");
        Ok(count)
    }

    /// Spawn a task that refreshes the mirror every `period`, starting now.
    ///
    /// Abort the returned handle on shutdown.
    #[must_use]
    pub fn spawn_refresher(&self, period: Duration) -> JoinHandle<()> {
        let mirror = self.clone();
        info!(period_secs = period.as_secs(), "Spawning catalog refresh task");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match mirror.refresh().await {
                    Ok(count) => info!(count, "Catalog synchronized"),
                    Err(e) => error!(error = %e, "Catalog synchronization failed"),
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, http::StatusCode, routing::get};
    use boutique_core::Money;

    use super::*;

    fn product(id: i32, category: &str) -> ProductSummary {
        ProductSummary {
            id: ProductId::new(id),
            article: format!("ART{id:03}"),
            name: format!("Item {id}"),
            price: Money::from_units(1_000),
            category: category.to_string(),
            image_url: None,
            stock: 3,
        }
    }

    /// Serve `router` on an ephemeral port and return its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_lookups_respect_category_and_limit() {
        let mirror = CatalogMirror::new("http://127.0.0.1:9/api/products");
        assert_eq!(mirror.feed_url(), "http://127.0.0.1:9/api/products");
        mirror
            .replace(CatalogFeed {
                products: vec![
                    product(1, "Dresses"),
                    product(2, "Coats"),
                    product(3, "Dresses"),
                    product(4, "Dresses"),
                ],
            })
            .await;

        let ids: Vec<i32> = mirror
            .by_category("Dresses", 2)
            .await
            .iter()
            .map(|p| p.id.as_i32())
            .collect();
        assert_eq!(ids, [1, 3]);
        assert_eq!(mirror.all(10).await.len(), 4);
        assert!(mirror.by_category("Shoes", 5).await.is_empty());
        assert_eq!(mirror.categories().await, ["Dresses", "Coats"]);
        assert_eq!(
            mirror.get(ProductId::new(2)).await.map(|p| p.article),
            Some("ART002".to_string())
        );
        assert!(mirror.get(ProductId::new(5)).await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_replaces_snapshot() {
        let body = serde_json::to_string(&CatalogFeed {
            products: vec![product(1, "Dresses"), product(2, "Bags")],
        })
        .unwrap();
        let base = serve(Router::new().route("/api/products", get(move || async move { body }))).await;
        let mirror = CatalogMirror::new(format!("{base}/api/products"));

        let before = mirror.snapshot().await;
        assert_eq!(mirror.refresh().await.unwrap(), 2);

        assert!(before.products.is_empty());
        assert_eq!(mirror.snapshot().await.products.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_snapshot() {
        let base = serve(
            Router::new()
                .route("/broken", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
                .route("/garbled", get(|| async { "<html>maintenance</html>" })),
        )
        .await;
        let seeded = CatalogFeed {
            products: vec![product(1, "Dresses")],
        };

        let broken = CatalogMirror::new(format!("{base}/broken"));
        broken.replace(seeded.clone()).await;
        assert!(matches!(
            broken.refresh().await,
            Err(CatalogSyncError::Status(StatusCode::INTERNAL_SERVER_ERROR))
        ));
        assert_eq!(*broken.snapshot().await, seeded);

        let garbled = CatalogMirror::new(format!("{base}/garbled"));
        garbled.replace(seeded.clone()).await;
        assert!(matches!(
            garbled.refresh().await,
            Err(CatalogSyncError::Parse(_))
        ));
        assert_eq!(*garbled.snapshot().await, seeded);

        let unreachable = CatalogMirror::new("http://127.0.0.1:9/api/products");
        unreachable.replace(seeded.clone()).await;
        assert!(matches!(
            unreachable.refresh().await,
            Err(CatalogSyncError::Http(_))
        ));
        assert_eq!(*unreachable.snapshot().await, seeded);
    }
}
