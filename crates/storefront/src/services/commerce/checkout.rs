//! Checkout planning.
//!
//! Store backends run checkout as a single transaction: load the cart, lock
//! the products it references, call [`plan_checkout`], apply the plan and
//! commit. Every rule that can reject an order is checked while planning, so
//! nothing is written unless the whole order goes through.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use boutique_core::{
    CartTotals, DeliveryPricing, ORDER_ITEMS_SCHEMA_VERSION, OrderId, OrderItem, OrderNumber,
    OrderStatus, PaymentStatus, ProductId, UserId,
};

use super::CommerceError;
use crate::db::RepositoryError;
use crate::models::cart::compute_totals;
use crate::models::{CartLine, CheckoutRequest, Order, Product};

/// Units moved between `stock` and `reserved` for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Everything checkout will write, computed before writing anything.
#[derive(Debug, Clone)]
pub struct CheckoutPlan {
    pub items: Vec<OrderItem>,
    pub totals: CartTotals,
    /// One entry per product, ascending by product id.
    pub reservations: Vec<Reservation>,
}

impl CheckoutPlan {
    /// Materialize the order this plan describes.
    #[must_use]
    pub fn into_order(
        self,
        user_id: UserId,
        order_number: OrderNumber,
        request: &CheckoutRequest,
        now: DateTime<Utc>,
    ) -> Order {
        Order {
            id: OrderId::generate(),
            order_number,
            user_id,
            items: self.items,
            items_version: ORDER_ITEMS_SCHEMA_VERSION,
            subtotal: self.totals.subtotal,
            delivery_cost: self.totals.delivery,
            final_amount: self.totals.final_amount,
            status: OrderStatus::New,
            payment_status: PaymentStatus::Pending,
            delivery_address: request.delivery_address.clone(),
            delivery_type: request.delivery_type,
            payment_method: request.payment_method.clone(),
            customer_notes: request.customer_notes.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Validate a requested quantity.
///
/// # Errors
///
/// Returns `CommerceError::InvalidQuantity` unless `quantity` is at least one
/// and fits the stock counters.
pub fn validate_quantity(quantity: i64) -> Result<u32, CommerceError> {
    match u32::try_from(quantity) {
        Ok(q) if q >= 1 => Ok(q),
        _ => Err(CommerceError::InvalidQuantity(quantity)),
    }
}

/// Check that `quantity` units of `product` may be put in a cart.
///
/// Only current available stock is compared; nothing is held until checkout.
///
/// # Errors
///
/// Returns `CommerceError::InactiveProduct` or `CommerceError::InsufficientStock`.
pub fn check_addable(product: &Product, quantity: u32) -> Result<(), CommerceError> {
    if !product.is_active {
        return Err(CommerceError::InactiveProduct(product.name.clone()));
    }
    if product.stock < quantity {
        return Err(CommerceError::InsufficientStock(product.name.clone()));
    }
    Ok(())
}

/// Plan a checkout of `lines` against the current (locked) catalog state.
///
/// Lines for the same product in different sizes or colors draw on the same
/// stock, so demand is summed per product before comparing. The first line
/// (in cart order) whose product cannot cover the demand names the error.
///
/// # Errors
///
/// - `CommerceError::EmptyCart` if there are no lines
/// - `CommerceError::NotFound` if a product has disappeared
/// - `CommerceError::InactiveProduct` if a product was withdrawn
/// - `CommerceError::InsufficientStock` if stock cannot cover the cart
/// - `CommerceError::AmountOverflow` if the totals cannot be represented
pub fn plan_checkout(
    lines: &[CartLine],
    products: &BTreeMap<ProductId, Product>,
    pricing: &DeliveryPricing,
) -> Result<CheckoutPlan, CommerceError> {
    if lines.is_empty() {
        return Err(CommerceError::EmptyCart);
    }

    let mut demand: BTreeMap<ProductId, u32> = BTreeMap::new();
    for line in lines {
        let product = products
            .get(&line.product_id)
            .ok_or_else(|| CommerceError::not_found("product", line.product_id))?;
        if !product.is_active {
            return Err(CommerceError::InactiveProduct(product.name.clone()));
        }
        let total = demand.entry(line.product_id).or_insert(0);
        *total = total.saturating_add(line.quantity);
    }

    for line in lines {
        let wanted = demand.get(&line.product_id).copied().unwrap_or_default();
        let short = products
            .get(&line.product_id)
            .filter(|product| product.stock < wanted);
        if let Some(product) = short {
            return Err(CommerceError::InsufficientStock(product.name.clone()));
        }
    }

    let items = lines
        .iter()
        .filter_map(|line| {
            products.get(&line.product_id).map(|product| OrderItem {
                product_id: product.id,
                name: product.name.clone(),
                article: product.article.clone(),
                price: line.unit_price,
                quantity: line.quantity,
                size: line.size.clone(),
                color: line.color.clone(),
            })
        })
        .collect();

    let reservations = demand
        .into_iter()
        .map(|(product_id, quantity)| Reservation {
            product_id,
            quantity,
        })
        .collect();

    let totals = compute_totals(lines, pricing).ok_or(CommerceError::AmountOverflow)?;

    Ok(CheckoutPlan {
        items,
        totals,
        reservations,
    })
}

/// Units to hand back to stock when `order` is cancelled.
///
/// # Errors
///
/// Returns `CommerceError::InvalidTransition` unless the order is `new` or `paid`.
pub fn plan_release(order: &Order) -> Result<Vec<Reservation>, CommerceError> {
    if !order.status.can_transition_to(OrderStatus::Cancelled) {
        return Err(CommerceError::InvalidTransition {
            from: order.status,
            to: OrderStatus::Cancelled,
        });
    }

    let mut held: BTreeMap<ProductId, u32> = BTreeMap::new();
    for item in &order.items {
        let total = held.entry(item.product_id).or_insert(0);
        *total = total.saturating_add(item.quantity);
    }

    Ok(held
        .into_iter()
        .map(|(product_id, quantity)| Reservation {
            product_id,
            quantity,
        })
        .collect())
}

/// Check a forward lifecycle step.
///
/// # Errors
///
/// Returns `CommerceError::InvalidTransition` for anything other than
/// `new → paid → shipped → delivered`.
pub fn check_advance(from: OrderStatus, to: OrderStatus) -> Result<(), CommerceError> {
    if to != OrderStatus::Cancelled && from.can_transition_to(to) {
        Ok(())
    } else {
        Err(CommerceError::InvalidTransition { from, to })
    }
}

/// Stage reserved copies of the affected products without touching the originals.
///
/// # Errors
///
/// Returns `CommerceError::InsufficientStock` if a product cannot cover its
/// reservation, and `CommerceError::NotFound` if it is missing.
pub fn stage_reservations(
    products: &BTreeMap<ProductId, Product>,
    reservations: &[Reservation],
    now: DateTime<Utc>,
) -> Result<Vec<Product>, CommerceError> {
    reservations
        .iter()
        .map(|r| {
            let product = products
                .get(&r.product_id)
                .ok_or_else(|| CommerceError::not_found("product", r.product_id))?;
            let mut staged = product
                .reserved_by(r.quantity)
                .ok_or_else(|| CommerceError::InsufficientStock(product.name.clone()))?;
            staged.updated_at = now;
            Ok(staged)
        })
        .collect()
}

/// Stage released copies of the affected products without touching the originals.
///
/// # Errors
///
/// Returns `CommerceError::Repository` with a data corruption error if a
/// product holds fewer reserved units than the order claims.
pub fn stage_releases(
    products: &BTreeMap<ProductId, Product>,
    releases: &[Reservation],
    now: DateTime<Utc>,
) -> Result<Vec<Product>, CommerceError> {
    releases
        .iter()
        .map(|r| {
            let product = products
                .get(&r.product_id)
                .ok_or_else(|| CommerceError::not_found("product", r.product_id))?;
            let mut staged = product.released_by(r.quantity).ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "product {} has {} reserved units, cannot release {}",
                    product.id, product.reserved, r.quantity
                ))
            })?;
            staged.updated_at = now;
            Ok(staged)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use boutique_core::{CartLineId, Money};

    use super::*;

    fn product(id: i32, name: &str, price: i64, stock: u32) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(id),
            article: format!("VOGUE{id:03}"),
            name: name.to_string(),
            category: "Dresses".to_string(),
            price: Money::from_units(price),
            stock,
            reserved: 0,
            is_active: true,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn line(id: i32, product: &Product, quantity: u32, size: Option<&str>) -> CartLine {
        CartLine {
            id: CartLineId::new(id),
            user_id: UserId::new(1),
            product_id: product.id,
            quantity,
            size: size.map(String::from),
            color: None,
            unit_price: product.price,
            added_at: Utc::now(),
        }
    }

    fn catalog(products: &[Product]) -> BTreeMap<ProductId, Product> {
        products.iter().map(|p| (p.id, p.clone())).collect()
    }

    #[test]
    fn test_validate_quantity() {
        assert_eq!(validate_quantity(3).unwrap(), 3);
        assert!(matches!(
            validate_quantity(0),
            Err(CommerceError::InvalidQuantity(0))
        ));
        assert!(matches!(
            validate_quantity(-2),
            Err(CommerceError::InvalidQuantity(-2))
        ));
        assert!(validate_quantity(i64::MAX).is_err());
    }

    #[test]
    fn test_plan_reconciles_totals() {
        let a = product(1, "Dress A", 25_000, 10);
        let b = product(2, "Dress B", 30_000, 10);
        let c = product(3, "Dress C", 35_000, 10);
        let lines = [line(1, &a, 1, None), line(2, &b, 1, None), line(3, &c, 1, None)];

        let plan = plan_checkout(&lines, &catalog(&[a, b, c]), &DeliveryPricing::default())
            .unwrap();

        assert_eq!(plan.totals.subtotal, Money::from_units(90_000));
        assert_eq!(plan.totals.delivery, Money::ZERO);
        assert_eq!(plan.totals.final_amount, Money::from_units(90_000));
        assert_eq!(plan.items.len(), 3);
        assert_eq!(plan.reservations.len(), 3);
    }

    #[test]
    fn test_plan_rejects_empty_cart() {
        let result = plan_checkout(&[], &BTreeMap::new(), &DeliveryPricing::default());
        assert!(matches!(result, Err(CommerceError::EmptyCart)));
    }

    #[test]
    fn test_plan_rejects_unrepresentable_total() {
        let mut gown = product(1, "Gown", 0, 10);
        gown.price = Money::new(rust_decimal::Decimal::MAX);
        let lines = [line(1, &gown, 2, None)];

        let result = plan_checkout(&lines, &catalog(&[gown]), &DeliveryPricing::default());

        assert!(matches!(result, Err(CommerceError::AmountOverflow)));
    }

    #[test]
    fn test_plan_sums_demand_across_variants() {
        let dress = product(1, "Silk dress", 30_000, 3);
        let lines = [line(1, &dress, 2, Some("S")), line(2, &dress, 2, Some("M"))];

        let result = plan_checkout(&lines, &catalog(&[dress]), &DeliveryPricing::default());

        match result {
            Err(CommerceError::InsufficientStock(name)) => assert_eq!(name, "Silk dress"),
            other => panic!("expected insufficient stock, got {other:?}"),
        }
    }

    #[test]
    fn test_plan_reports_first_short_line() {
        let plenty = product(1, "Coat", 50_000, 5);
        let scarce = product(2, "Scarf", 5_000, 1);
        let lines = [line(1, &plenty, 1, None), line(2, &scarce, 2, None)];

        let result = plan_checkout(
            &lines,
            &catalog(&[plenty, scarce]),
            &DeliveryPricing::default(),
        );

        assert!(matches!(result, Err(CommerceError::InsufficientStock(name)) if name == "Scarf"));
    }

    #[test]
    fn test_plan_rejects_withdrawn_product() {
        let mut dress = product(1, "Old dress", 10_000, 5);
        dress.is_active = false;
        let lines = [line(1, &dress, 1, None)];

        let result = plan_checkout(&lines, &catalog(&[dress]), &DeliveryPricing::default());

        assert!(matches!(result, Err(CommerceError::InactiveProduct(_))));
    }

    #[test]
    fn test_snapshot_uses_captured_price() {
        let mut dress = product(1, "Silk dress", 30_000, 5);
        let cart_line = line(1, &dress, 1, Some("M"));
        dress.price = Money::from_units(45_000);

        let plan = plan_checkout(
            &[cart_line],
            &catalog(&[dress]),
            &DeliveryPricing::default(),
        )
        .unwrap();

        let item = plan.items.first().unwrap();
        assert_eq!(item.price, Money::from_units(30_000));
        assert_eq!(item.size.as_deref(), Some("M"));
        assert_eq!(plan.totals.final_amount, Money::from_units(30_000));
    }

    #[test]
    fn test_stage_reservations_leaves_originals_untouched() {
        let dress = product(1, "Silk dress", 30_000, 2);
        let products = catalog(&[dress]);
        let reservations = [Reservation {
            product_id: ProductId::new(1),
            quantity: 2,
        }];

        let staged = stage_reservations(&products, &reservations, Utc::now()).unwrap();

        let staged = staged.first().unwrap();
        assert_eq!((staged.stock, staged.reserved), (0, 2));
        let original = products.get(&ProductId::new(1)).unwrap();
        assert_eq!((original.stock, original.reserved), (2, 0));
    }

    #[test]
    fn test_stage_releases_detects_missing_reservation() {
        let dress = product(1, "Silk dress", 30_000, 2);
        let releases = [Reservation {
            product_id: ProductId::new(1),
            quantity: 1,
        }];

        let result = stage_releases(&catalog(&[dress]), &releases, Utc::now());

        assert!(matches!(result, Err(CommerceError::Repository(_))));
    }

    #[test]
    fn test_check_advance() {
        assert!(check_advance(OrderStatus::New, OrderStatus::Paid).is_ok());
        assert!(check_advance(OrderStatus::New, OrderStatus::Delivered).is_err());
        assert!(check_advance(OrderStatus::New, OrderStatus::Cancelled).is_err());
    }
}
