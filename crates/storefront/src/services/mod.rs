//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `commerce` - Cart, checkout and order lifecycle

pub mod commerce;

pub use commerce::{CommerceError, CommerceService};
