//! Domain models for the storefront.
//!
//! These types represent validated domain objects, separate from the row
//! types each store backend reads and writes.

pub mod cart;
pub mod customer;
pub mod order;
pub mod product;

pub use cart::{AddToCart, CartLine, CartPreview};
pub use customer::Customer;
pub use order::{CheckoutRequest, Order, PlacedOrder};
pub use product::{NewProduct, Product};
