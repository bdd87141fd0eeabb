//! Boutique storefront - catalog, cart and checkout service.
//!
//! # Storage
//!
//! - With `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) set, data lives in
//!   `PostgreSQL`. Migrations are NOT run on startup; use
//!   `cargo run -p boutique-cli -- migrate`.
//! - Otherwise an in-memory store is seeded with the demo catalog. Its
//!   contents are lost on restart.

#![cfg_attr(not(test), forbid(unsafe_code))]

use boutique_storefront::config::StorefrontConfig;
use boutique_storefront::db::{self, MemoryStore, PgStore, Store};
use boutique_storefront::routes;
use boutique_storefront::seed::seed_demo;
use boutique_storefront::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Open the configured store.
async fn open_store(config: &StorefrontConfig) -> Store {
    if let Some(url) = &config.database_url {
        let pool = db::create_pool(url)
            .await
            .expect("Failed to create database pool");
        tracing::info!("Database pool created");
        return Store::Postgres(PgStore::new(pool));
    }

    tracing::warn!("No database configured, using in-memory store with demo data");
    let store = Store::Memory(MemoryStore::new());
    seed_demo(&store)
        .await
        .expect("Failed to seed in-memory store");
    store
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "boutique_storefront=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let store = open_store(&config).await;
    tracing::info!(backend = store.backend(), "Store ready");

    let state = AppState::new(config.clone(), store);

    let app = routes::app(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!("storefront listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
