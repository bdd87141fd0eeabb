//! Boutique Core - Shared commerce types.
//!
//! This crate provides the domain vocabulary shared by every Boutique component:
//! - `storefront` - Web front end, cart and checkout engine
//! - `bot` - Chat front end mirroring the catalog
//! - `cli` - Migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Anything that needs a lock or a connection lives in
//! the service crates.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, money, statuses, order numbers, order snapshots and
//!   cart totals

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
