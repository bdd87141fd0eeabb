//! Shared bot state.

use std::sync::Arc;

use crate::broadcast::BroadcastFlow;
use crate::catalog::CatalogMirror;
use crate::config::BotConfig;
use crate::session::SessionStore;

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct BotState {
    inner: Arc<BotStateInner>,
}

struct BotStateInner {
    config: BotConfig,
    catalog: CatalogMirror,
    broadcasts: BroadcastFlow,
}

impl BotState {
    /// Build the state from configuration. Background tasks are not started.
    #[must_use]
    pub fn new(config: BotConfig) -> Self {
        let sessions = SessionStore::new(config.session_ttl);
        let broadcasts = BroadcastFlow::new(sessions, config.admin_ids.clone());
        let catalog = CatalogMirror::new(config.web_link("api/products"));

        Self {
            inner: Arc::new(BotStateInner {
                config,
                catalog,
                broadcasts,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &BotConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogMirror {
        &self.inner.catalog
    }

    #[must_use]
    pub fn broadcasts(&self) -> &BroadcastFlow {
        &self.inner.broadcasts
    }
}
