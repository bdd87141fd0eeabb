//! In-process store.
//!
//! All state sits behind a single `tokio::sync::RwLock`. Every mutating
//! operation holds the write guard from its first read to its last write, so
//! each one is serializable; readers take the read guard and only ever see
//! the state between two operations.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;

use boutique_core::{
    CartLineId, DeliveryPricing, Money, OrderId, OrderNumber, OrderStatus, PaymentStatus,
    ProductId, UserId,
};

use super::RepositoryError;
use crate::models::{CartLine, CheckoutRequest, Customer, NewProduct, Order, Product};
use crate::services::commerce::{CommerceError, checkout};

#[derive(Debug, Default)]
struct MemoryState {
    products: BTreeMap<ProductId, Product>,
    customers: BTreeMap<UserId, Customer>,
    /// Lines per customer, in insertion order.
    carts: HashMap<UserId, Vec<CartLine>>,
    /// Orders in creation order.
    orders: Vec<Order>,
    /// Last order sequence handed out per calendar day.
    order_sequence: HashMap<NaiveDate, u32>,
    last_product_id: i32,
    last_cart_line_id: i32,
}

impl MemoryState {
    fn next_product_id(&mut self) -> Result<ProductId, RepositoryError> {
        self.last_product_id = self
            .last_product_id
            .checked_add(1)
            .ok_or_else(|| RepositoryError::Conflict("product ids exhausted".to_string()))?;
        Ok(ProductId::new(self.last_product_id))
    }

    fn next_cart_line_id(&mut self) -> Result<CartLineId, RepositoryError> {
        self.last_cart_line_id = self
            .last_cart_line_id
            .checked_add(1)
            .ok_or_else(|| RepositoryError::Conflict("cart line ids exhausted".to_string()))?;
        Ok(CartLineId::new(self.last_cart_line_id))
    }

    fn order_mut(&mut self, id: OrderId) -> Result<&mut Order, CommerceError> {
        self.orders
            .iter_mut()
            .find(|order| order.id == id)
            .ok_or_else(|| CommerceError::not_found("order", id))
    }
}

/// Store backed by process memory. Cloning shares the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) async fn insert_product(
        &self,
        product: NewProduct,
    ) -> Result<Product, RepositoryError> {
        let mut state = self.state.write().await;
        if state.products.values().any(|p| p.article == product.article) {
            return Err(RepositoryError::Conflict(format!(
                "article {} already exists",
                product.article
            )));
        }

        let now = Utc::now();
        let product = Product {
            id: state.next_product_id()?,
            article: product.article,
            name: product.name,
            category: product.category,
            price: product.price,
            stock: product.stock,
            reserved: 0,
            is_active: true,
            image_url: product.image_url,
            created_at: now,
            updated_at: now,
        };
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    pub(super) async fn set_product_active(
        &self,
        id: ProductId,
        is_active: bool,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        product.is_active = is_active;
        product.updated_at = Utc::now();
        Ok(())
    }

    pub(super) async fn get_product(&self, id: ProductId) -> Option<Product> {
        self.state.read().await.products.get(&id).cloned()
    }

    pub(super) async fn active_products(&self) -> Vec<Product> {
        self.state
            .read()
            .await
            .products
            .values()
            .filter(|p| p.is_active)
            .cloned()
            .collect()
    }

    pub(super) async fn ensure_customer(&self, id: UserId, display_name: &str) -> Customer {
        let mut state = self.state.write().await;
        state
            .customers
            .entry(id)
            .or_insert_with(|| Customer {
                id,
                display_name: display_name.to_string(),
                total_orders: 0,
                total_spent: Money::ZERO,
                created_at: Utc::now(),
            })
            .clone()
    }

    pub(super) async fn get_customer(&self, id: UserId) -> Option<Customer> {
        self.state.read().await.customers.get(&id).cloned()
    }

    pub(super) async fn cart_lines(&self, user_id: UserId) -> Vec<CartLine> {
        self.state
            .read()
            .await
            .carts
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub(super) async fn add_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
        size: Option<String>,
        color: Option<String>,
    ) -> Result<CartLine, CommerceError> {
        let mut state = self.state.write().await;

        if !state.customers.contains_key(&user_id) {
            return Err(CommerceError::not_found("customer", user_id));
        }
        let product = state
            .products
            .get(&product_id)
            .ok_or_else(|| CommerceError::not_found("product", product_id))?;
        checkout::check_addable(product, quantity)?;
        let unit_price = product.price;

        let existing = state.carts.get_mut(&user_id).and_then(|lines| {
            lines
                .iter_mut()
                .find(|line| line.has_key(product_id, size.as_deref(), color.as_deref()))
        });
        if let Some(line) = existing {
            line.quantity = line
                .quantity
                .checked_add(quantity)
                .ok_or(CommerceError::InvalidQuantity(i64::from(quantity)))?;
            return Ok(line.clone());
        }

        let line = CartLine {
            id: state.next_cart_line_id()?,
            user_id,
            product_id,
            quantity,
            size,
            color,
            unit_price,
            added_at: Utc::now(),
        };
        state.carts.entry(user_id).or_default().push(line.clone());
        Ok(line)
    }

    pub(super) async fn remove_cart_line(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<(), CommerceError> {
        let mut state = self.state.write().await;
        let lines = state
            .carts
            .get_mut(&user_id)
            .ok_or_else(|| CommerceError::not_found("cart line", line_id))?;
        let before = lines.len();
        lines.retain(|line| line.id != line_id);
        if lines.len() == before {
            return Err(CommerceError::not_found("cart line", line_id));
        }
        if lines.is_empty() {
            state.carts.remove(&user_id);
        }
        Ok(())
    }

    pub(super) async fn checkout(
        &self,
        user_id: UserId,
        request: &CheckoutRequest,
        pricing: &DeliveryPricing,
        today: NaiveDate,
    ) -> Result<Order, CommerceError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        if !state.customers.contains_key(&user_id) {
            return Err(CommerceError::not_found("customer", user_id));
        }
        let lines = state.carts.get(&user_id).map_or(&[][..], Vec::as_slice);
        let plan = checkout::plan_checkout(lines, &state.products, pricing)?;

        let now = Utc::now();
        let staged = checkout::stage_reservations(&state.products, &plan.reservations, now)?;
        let sequence = state
            .order_sequence
            .get(&today)
            .copied()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| RepositoryError::Conflict(format!("order sequence for {today} exhausted")))?;
        let order_number = OrderNumber::compose(today, user_id, sequence);
        let order = plan.into_order(user_id, order_number, request, now);

        // Nothing below can fail.
        state.order_sequence.insert(today, sequence);
        for product in staged {
            state.products.insert(product.id, product);
        }
        state.carts.remove(&user_id);
        if let Some(customer) = state.customers.get_mut(&user_id) {
            customer.record_order(order.final_amount);
        }
        state.orders.push(order.clone());

        Ok(order)
    }

    pub(super) async fn orders_for(&self, user_id: UserId) -> Vec<Order> {
        self.state
            .read()
            .await
            .orders
            .iter()
            .rev()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect()
    }

    pub(super) async fn get_order(&self, id: OrderId) -> Option<Order> {
        self.state
            .read()
            .await
            .orders
            .iter()
            .find(|order| order.id == id)
            .cloned()
    }

    pub(super) async fn cancel_order(&self, id: OrderId) -> Result<Order, CommerceError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let releases = checkout::plan_release(state.order_mut(id)?)?;
        let now = Utc::now();
        let staged = checkout::stage_releases(&state.products, &releases, now)?;

        for product in staged {
            state.products.insert(product.id, product);
        }
        let order = state.order_mut(id)?;
        order.status = OrderStatus::Cancelled;
        order.updated_at = now;
        Ok(order.clone())
    }

    pub(super) async fn advance_order(
        &self,
        id: OrderId,
        to: OrderStatus,
    ) -> Result<Order, CommerceError> {
        let mut state = self.state.write().await;
        let order = state.order_mut(id)?;
        checkout::check_advance(order.status, to)?;

        order.status = to;
        if to == OrderStatus::Paid {
            order.payment_status = PaymentStatus::Paid;
        }
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}
