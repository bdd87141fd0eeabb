//! Cart, checkout and order service.
//!
//! Thin orchestration over [`Store`]: validates input, stamps the business
//! date and logs outcomes. The atomicity guarantees live in the store
//! backends, the rules in [`checkout`].

pub mod checkout;
mod error;

pub use error::CommerceError;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use boutique_core::{CartLineId, DeliveryPricing, OrderId, OrderStatus, ProductId, UserId};

use crate::db::Store;
use crate::models::{
    AddToCart, CartLine, CartPreview, CheckoutRequest, Customer, Order, PlacedOrder, Product,
};

/// Cart, checkout and order operations for the storefront.
#[derive(Clone)]
pub struct CommerceService {
    store: Store,
    pricing: DeliveryPricing,
}

impl CommerceService {
    /// Create a service over the given store.
    #[must_use]
    pub const fn new(store: Store, pricing: DeliveryPricing) -> Self {
        Self { store, pricing }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// Products currently on sale.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Repository` if the store fails.
    pub async fn list_products(&self) -> Result<Vec<Product>, CommerceError> {
        Ok(self.store.active_products().await?)
    }

    /// One product on sale.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` if the product is unknown or withdrawn.
    pub async fn product(&self, product_id: ProductId) -> Result<Product, CommerceError> {
        self.store
            .get_product(product_id)
            .await?
            .filter(|product| product.is_active)
            .ok_or_else(|| CommerceError::not_found("product", product_id))
    }

    /// Record a customer on first contact, returning their account.
    ///
    /// Known customers are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Repository` if the store fails.
    pub async fn register_customer(&self, user_id: UserId) -> Result<Customer, CommerceError> {
        let customer = self
            .store
            .ensure_customer(user_id, &format!("Customer {user_id}"))
            .await?;
        debug!(customer = %customer.id, "Customer registered");
        Ok(customer)
    }

    /// The customer's cart lines in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Repository` if the store fails.
    pub async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, CommerceError> {
        Ok(self.store.cart_lines(user_id).await?)
    }

    /// The customer's cart priced the way checkout will price it.
    ///
    /// # Errors
    ///
    /// - `CommerceError::Repository` if the store fails
    /// - `CommerceError::AmountOverflow` if the totals cannot be represented
    pub async fn cart_preview(&self, user_id: UserId) -> Result<CartPreview, CommerceError> {
        let lines = self.store.cart_lines(user_id).await?;
        CartPreview::new(lines, &self.pricing).ok_or(CommerceError::AmountOverflow)
    }

    /// Add a product selection to the customer's cart.
    ///
    /// An identical `(product, size, color)` selection has its quantity
    /// increased; otherwise a new line is created at the current price.
    /// A customer seen for the first time is registered.
    ///
    /// # Errors
    ///
    /// - `CommerceError::InvalidQuantity` if the quantity is below one
    /// - `CommerceError::NotFound` for an unknown product
    /// - `CommerceError::InactiveProduct` if the product is withdrawn
    /// - `CommerceError::InsufficientStock` if available stock is below the quantity
    #[instrument(skip(self, request), fields(product_id = %request.product_id))]
    pub async fn add_to_cart(
        &self,
        user_id: UserId,
        request: AddToCart,
    ) -> Result<CartLine, CommerceError> {
        let quantity = checkout::validate_quantity(request.quantity)?;
        self.register_customer(user_id).await?;
        let line = self
            .store
            .add_cart_line(
                user_id,
                request.product_id,
                quantity,
                request.normalized_size(),
                request.normalized_color(),
            )
            .await?;

        info!(line_id = %line.id, quantity = line.quantity, "Cart line updated");
        Ok(line)
    }

    /// Remove one line from the customer's cart.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` if the customer has no such line.
    #[instrument(skip(self))]
    pub async fn remove_cart_line(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<(), CommerceError> {
        self.store.remove_cart_line(user_id, line_id).await
    }

    /// Turn the customer's cart into an order.
    ///
    /// Stock is reserved, the order recorded, the cart cleared and the
    /// customer's counters bumped as one atomic step. On any error nothing
    /// changed.
    ///
    /// # Errors
    ///
    /// - `CommerceError::EmptyCart` if the cart has no lines
    /// - `CommerceError::NotFound` for an unknown customer or a vanished product
    /// - `CommerceError::InactiveProduct` if a product was withdrawn since it was added
    /// - `CommerceError::InsufficientStock` naming the first product that falls short
    /// - `CommerceError::ConcurrentModification` if the database aborted the transaction
    #[instrument(skip(self, request))]
    pub async fn checkout(
        &self,
        user_id: UserId,
        request: &CheckoutRequest,
    ) -> Result<PlacedOrder, CommerceError> {
        let today = Utc::now().date_naive();
        match self
            .store
            .checkout(user_id, request, &self.pricing, today)
            .await
        {
            Ok(order) => {
                info!(
                    order_number = %order.order_number,
                    final_amount = %order.final_amount,
                    items = order.items.len(),
                    "Order created"
                );
                Ok(PlacedOrder::from(&order))
            }
            Err(e) => {
                warn!(error = %e, "Checkout rejected");
                Err(e)
            }
        }
    }

    /// The customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Repository` if the store fails.
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, CommerceError> {
        Ok(self.store.orders_for(user_id).await?)
    }

    /// Look up one order.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` if there is no such order.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, CommerceError> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| CommerceError::not_found("order", order_id))
    }

    /// Cancel an order on behalf of its owner.
    ///
    /// Orders belonging to someone else are reported as not found.
    ///
    /// # Errors
    ///
    /// - `CommerceError::NotFound` if the customer has no such order
    /// - `CommerceError::InvalidTransition` once the order has shipped
    #[instrument(skip(self))]
    pub async fn cancel_customer_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Order, CommerceError> {
        let order = self.get_order(order_id).await?;
        if order.user_id != user_id {
            return Err(CommerceError::not_found("order", order_id));
        }
        self.cancel_order(order_id).await
    }

    /// Cancel an order and return its units to stock.
    ///
    /// # Errors
    ///
    /// - `CommerceError::NotFound` if there is no such order
    /// - `CommerceError::InvalidTransition` unless the order is `new` or `paid`
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<Order, CommerceError> {
        let order = self.store.cancel_order(order_id).await?;
        info!(order_number = %order.order_number, "Order cancelled");
        Ok(order)
    }

    /// Move an order one step along `new → paid → shipped → delivered`.
    ///
    /// # Errors
    ///
    /// - `CommerceError::NotFound` if there is no such order
    /// - `CommerceError::InvalidTransition` for any other step
    #[instrument(skip(self))]
    pub async fn advance_order(
        &self,
        order_id: OrderId,
        to: OrderStatus,
    ) -> Result<Order, CommerceError> {
        let order = self.store.advance_order(order_id, to).await?;
        info!(order_number = %order.order_number, status = %order.status, "Order advanced");
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use boutique_core::Money;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::NewProduct;

    async fn service_with_dress(stock: u32) -> (CommerceService, Product) {
        let store = Store::Memory(MemoryStore::new());
        let dress = store
            .insert_product(NewProduct::new(
                "VOGUE001",
                "Silk dress",
                Money::from_units(30_000),
                stock,
            ))
            .await
            .unwrap();
        (CommerceService::new(store, DeliveryPricing::default()), dress)
    }

    #[tokio::test]
    async fn test_first_add_registers_customer() {
        let (service, dress) = service_with_dress(5).await;
        let newcomer = UserId::new(777);

        service
            .add_to_cart(newcomer, AddToCart::new(dress.id, 1))
            .await
            .unwrap();
        let placed = service
            .checkout(newcomer, &CheckoutRequest::default())
            .await
            .unwrap();

        let customer = service.register_customer(newcomer).await.unwrap();
        assert_eq!(customer.display_name, "Customer 777");
        assert_eq!(customer.total_orders, 1);
        assert_eq!(customer.total_spent, placed.final_amount);
    }

    #[tokio::test]
    async fn test_register_keeps_existing_account() {
        let (service, _) = service_with_dress(5).await;
        service
            .store()
            .ensure_customer(UserId::new(1), "Anna")
            .await
            .unwrap();

        let customer = service.register_customer(UserId::new(1)).await.unwrap();

        assert_eq!(customer.display_name, "Anna");
        assert_eq!(customer.total_orders, 0);
    }

    #[tokio::test]
    async fn test_rejected_add_still_fails_for_newcomer() {
        let (service, dress) = service_with_dress(1).await;

        let result = service
            .add_to_cart(UserId::new(778), AddToCart::new(dress.id, 2))
            .await;

        assert!(matches!(result, Err(CommerceError::InsufficientStock(_))));
    }

    #[tokio::test]
    async fn test_product_hides_withdrawn_items() {
        let (service, dress) = service_with_dress(5).await;
        assert_eq!(service.product(dress.id).await.unwrap().article, "VOGUE001");

        service
            .store()
            .set_product_active(dress.id, false)
            .await
            .unwrap();

        assert!(matches!(
            service.product(dress.id).await,
            Err(CommerceError::NotFound(_))
        ));
        assert!(matches!(
            service.product(ProductId::new(999)).await,
            Err(CommerceError::NotFound(_))
        ));
    }
}
