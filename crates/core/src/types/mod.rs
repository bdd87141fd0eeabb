//! Core types for Boutique.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod catalog;
pub mod id;
pub mod money;
pub mod order;
pub mod status;
pub mod totals;

pub use catalog::{CatalogFeed, ProductSummary};
pub use id::*;
pub use money::Money;
pub use order::{ORDER_ITEMS_SCHEMA_VERSION, OrderItem, OrderNumber};
pub use status::*;
pub use totals::{CartTotals, DeliveryPricing};
