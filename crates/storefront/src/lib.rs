//! Boutique storefront library.
//!
//! Catalog, cart, checkout and order history behind a JSON API. The binary
//! in `main.rs` wires configuration, storage, tracing and Sentry around the
//! router built by [`routes::app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
