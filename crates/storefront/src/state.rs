//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::Store;
use crate::services::CommerceService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the store and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    commerce: CommerceService,
}

impl AppState {
    /// Create a new application state over an already opened store.
    #[must_use]
    pub fn new(config: StorefrontConfig, store: Store) -> Self {
        let commerce = CommerceService::new(store, config.pricing);
        Self {
            inner: Arc::new(AppStateInner { config, commerce }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the cart, checkout and order service.
    #[must_use]
    pub fn commerce(&self) -> &CommerceService {
        &self.inner.commerce
    }

    /// Get a reference to the store backend.
    #[must_use]
    pub fn store(&self) -> &Store {
        self.inner.commerce.store()
    }
}
