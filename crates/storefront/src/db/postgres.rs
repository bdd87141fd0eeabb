//! `PostgreSQL` store.
//!
//! Every mutating operation is one transaction. Checkout and cancellation
//! lock the affected product rows with `SELECT ... FOR UPDATE` in ascending
//! id order, so competing transactions queue on the same rows in the same
//! order and never deadlock. The `CHECK` constraints on `storefront.product`
//! back the counters up at the database level.
//!
//! Queries use the runtime-checked `sqlx::query*` functions so the crate
//! builds without a live database.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use boutique_core::{
    CartLineId, DeliveryPricing, DeliveryType, Money, OrderId, OrderItem, OrderNumber,
    OrderStatus, PaymentStatus, ProductId, UserId,
};

use super::RepositoryError;
use crate::models::{CartLine, CheckoutRequest, Customer, NewProduct, Order, Product};
use crate::services::commerce::{CommerceError, checkout};

const PRODUCT_COLUMNS: &str = "id, article, name, category, price, stock, reserved, is_active, \
     image_url, created_at, updated_at";

const CART_LINE_COLUMNS: &str = "id, user_id, product_id, quantity, selected_size, \
     selected_color, unit_price, added_at";

const ORDER_COLUMNS: &str = "id, order_number, user_id, items, items_version, subtotal, \
     delivery_cost, final_amount, status, payment_status, delivery_address, delivery_type, \
     payment_method, customer_notes, created_at, updated_at";

/// SQLSTATE codes for serialization failure and detected deadlock.
const RETRYABLE_SQLSTATES: [&str; 2] = ["40001", "40P01"];

/// SQLSTATE code for a unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    article: String,
    name: String,
    category: String,
    price: Decimal,
    stock: i32,
    reserved: i32,
    is_active: bool,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProductId::new(row.id),
            article: row.article,
            name: row.name,
            category: row.category,
            price: Money::new(row.price),
            stock: counter("product.stock", row.stock)?,
            reserved: counter("product.reserved", row.reserved)?,
            is_active: row.is_active,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i32,
    display_name: String,
    total_orders: i32,
    total_spent: Decimal,
    created_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = RepositoryError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::new(row.id),
            display_name: row.display_name,
            total_orders: counter("customer.total_orders", row.total_orders)?,
            total_spent: Money::new(row.total_spent),
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: i32,
    user_id: i32,
    product_id: i32,
    quantity: i32,
    selected_size: String,
    selected_color: String,
    unit_price: Decimal,
    added_at: DateTime<Utc>,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CartLineId::new(row.id),
            user_id: UserId::new(row.user_id),
            product_id: ProductId::new(row.product_id),
            quantity: counter("cart_line.quantity", row.quantity)?,
            size: from_column(row.selected_size),
            color: from_column(row.selected_color),
            unit_price: Money::new(row.unit_price),
            added_at: row.added_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: i32,
    items: Json<Vec<OrderItem>>,
    items_version: i16,
    subtotal: Decimal,
    delivery_cost: Decimal,
    final_amount: Decimal,
    status: OrderStatus,
    payment_status: PaymentStatus,
    delivery_address: Option<String>,
    delivery_type: DeliveryType,
    payment_method: Option<String>,
    customer_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: OrderId::from_uuid(row.id),
            order_number: OrderNumber::from_stored(row.order_number),
            user_id: UserId::new(row.user_id),
            items: row.items.0,
            items_version: row.items_version,
            subtotal: Money::new(row.subtotal),
            delivery_cost: Money::new(row.delivery_cost),
            final_amount: Money::new(row.final_amount),
            status: row.status,
            payment_status: row.payment_status,
            delivery_address: row.delivery_address,
            delivery_type: row.delivery_type,
            payment_method: row.payment_method,
            customer_notes: row.customer_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn counter(column: &str, value: i32) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {column}: {value}")))
}

fn to_column(value: Option<&str>) -> &str {
    value.unwrap_or("")
}

fn from_column(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

fn bind_count(value: u32) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::Conflict(format!("count {value} exceeds column range")))
}

fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|code| code.into_owned()),
        _ => None,
    }
}

/// Map a database error raised inside a commerce transaction.
fn commerce_err(err: sqlx::Error) -> CommerceError {
    match sqlstate(&err) {
        Some(code) if RETRYABLE_SQLSTATES.contains(&code.as_str()) => {
            CommerceError::ConcurrentModification
        }
        _ => CommerceError::Repository(RepositoryError::Database(err)),
    }
}

// =============================================================================
// Store
// =============================================================================

/// Store backed by the `storefront` schema.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool (for migrations).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub(super) async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub(super) async fn insert_product(
        &self,
        product: NewProduct,
    ) -> Result<Product, RepositoryError> {
        let sql = format!(
            "INSERT INTO storefront.product (article, name, category, price, stock, image_url) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&product.article)
            .bind(&product.name)
            .bind(&product.category)
            .bind(product.price.amount())
            .bind(bind_count(product.stock)?)
            .bind(&product.image_url)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if sqlstate(&e).as_deref() == Some(UNIQUE_VIOLATION) {
                    RepositoryError::Conflict(format!("article {} already exists", product.article))
                } else {
                    RepositoryError::Database(e)
                }
            })?;
        row.try_into()
    }

    pub(super) async fn set_product_active(
        &self,
        id: ProductId,
        is_active: bool,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.product SET is_active = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(is_active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    pub(super) async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = $1");
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    pub(super) async fn active_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE is_active ORDER BY id"
        );
        sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect()
    }

    pub(super) async fn ensure_customer(
        &self,
        id: UserId,
        display_name: &str,
    ) -> Result<Customer, RepositoryError> {
        // The no-op update makes RETURNING yield the row on conflict too.
        let row = sqlx::query_as::<_, CustomerRow>(
            r"
            INSERT INTO storefront.customer (id, display_name)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET display_name = storefront.customer.display_name
            RETURNING id, display_name, total_orders, total_spent, created_at
            ",
        )
        .bind(id)
        .bind(display_name)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    pub(super) async fn get_customer(&self, id: UserId) -> Result<Option<Customer>, RepositoryError> {
        sqlx::query_as::<_, CustomerRow>(
            r"
            SELECT id, display_name, total_orders, total_spent, created_at
            FROM storefront.customer
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Customer::try_from)
        .transpose()
    }

    pub(super) async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let sql = format!(
            "SELECT {CART_LINE_COLUMNS} FROM storefront.cart_line WHERE user_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, CartLineRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(CartLine::try_from)
            .collect()
    }

    pub(super) async fn add_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
        size: Option<String>,
        color: Option<String>,
    ) -> Result<CartLine, CommerceError> {
        let mut tx = self.pool.begin().await.map_err(commerce_err)?;

        if !customer_exists(&mut tx, user_id, false).await? {
            return Err(CommerceError::not_found("customer", user_id));
        }

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = $1 FOR SHARE"
        );
        let product: Product = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(commerce_err)?
            .ok_or_else(|| CommerceError::not_found("product", product_id))?
            .try_into()?;
        checkout::check_addable(&product, quantity)?;

        let sql = format!(
            "INSERT INTO storefront.cart_line \
                 (user_id, product_id, quantity, selected_size, selected_color, unit_price) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT ON CONSTRAINT cart_line_identity \
             DO UPDATE SET quantity = storefront.cart_line.quantity + EXCLUDED.quantity \
             RETURNING {CART_LINE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CartLineRow>(&sql)
            .bind(user_id)
            .bind(product_id)
            .bind(bind_count(quantity)?)
            .bind(to_column(size.as_deref()))
            .bind(to_column(color.as_deref()))
            .bind(product.price.amount())
            .fetch_one(&mut *tx)
            .await
            .map_err(commerce_err)?;

        tx.commit().await.map_err(commerce_err)?;
        Ok(CartLine::try_from(row)?)
    }

    pub(super) async fn remove_cart_line(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<(), CommerceError> {
        let result =
            sqlx::query("DELETE FROM storefront.cart_line WHERE id = $1 AND user_id = $2")
                .bind(line_id)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(commerce_err)?;

        if result.rows_affected() == 0 {
            return Err(CommerceError::not_found("cart line", line_id));
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
        let mut tx = self.pool.begin().await.map_err(commerce_err)?;

        // Serializes checkouts of the same customer; products are locked below.
        if !customer_exists(&mut tx, user_id, true).await? {
            return Err(CommerceError::not_found("customer", user_id));
        }

        let sql = format!(
            "SELECT {CART_LINE_COLUMNS} FROM storefront.cart_line \
             WHERE user_id = $1 ORDER BY id FOR UPDATE"
        );
        let lines = sqlx::query_as::<_, CartLineRow>(&sql)
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(commerce_err)?
            .into_iter()
            .map(CartLine::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        if lines.is_empty() {
            return Err(CommerceError::EmptyCart);
        }

        let product_ids: Vec<ProductId> = lines.iter().map(|line| line.product_id).collect();
        let products = lock_products(&mut tx, &product_ids).await?;
        let plan = checkout::plan_checkout(&lines, &products, pricing)?;

        let now = Utc::now();
        let staged = checkout::stage_reservations(&products, &plan.reservations, now)?;
        write_counters(&mut tx, &staged).await?;

        let (sequence,): (i32,) = sqlx::query_as(
            r"
            INSERT INTO storefront.order_sequence (day, last_value)
            VALUES ($1, 1)
            ON CONFLICT (day) DO UPDATE SET last_value = storefront.order_sequence.last_value + 1
            RETURNING last_value
            ",
        )
        .bind(today)
        .fetch_one(&mut *tx)
        .await
        .map_err(commerce_err)?;
        let sequence = counter("order_sequence.last_value", sequence)?;

        let order = plan.into_order(
            user_id,
            OrderNumber::compose(today, user_id, sequence),
            request,
            now,
        );
        insert_order(&mut tx, &order).await?;

        sqlx::query("DELETE FROM storefront.cart_line WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(commerce_err)?;

        sqlx::query(
            r"
            UPDATE storefront.customer
            SET total_orders = total_orders + 1, total_spent = total_spent + $2
            WHERE id = $1
            ",
        )
        .bind(user_id)
        .bind(order.final_amount.amount())
        .execute(&mut *tx)
        .await
        .map_err(commerce_err)?;

        tx.commit().await.map_err(commerce_err)?;
        Ok(order)
    }

    pub(super) async fn orders_for(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.\"order\" \
             WHERE user_id = $1 ORDER BY created_at DESC, order_number DESC"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    pub(super) async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM storefront.\"order\" WHERE id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Order::from))
    }

    pub(super) async fn cancel_order(&self, id: OrderId) -> Result<Order, CommerceError> {
        let mut tx = self.pool.begin().await.map_err(commerce_err)?;

        let order = lock_order(&mut tx, id).await?;
        let releases = checkout::plan_release(&order)?;

        let product_ids: Vec<ProductId> = releases.iter().map(|r| r.product_id).collect();
        let products = lock_products(&mut tx, &product_ids).await?;
        let staged = checkout::stage_releases(&products, &releases, Utc::now())?;
        write_counters(&mut tx, &staged).await?;

        let order = update_status(&mut tx, id, OrderStatus::Cancelled, order.payment_status).await?;
        tx.commit().await.map_err(commerce_err)?;
        Ok(order)
    }

    pub(super) async fn advance_order(
        &self,
        id: OrderId,
        to: OrderStatus,
    ) -> Result<Order, CommerceError> {
        let mut tx = self.pool.begin().await.map_err(commerce_err)?;

        let order = lock_order(&mut tx, id).await?;
        checkout::check_advance(order.status, to)?;
        let payment_status = if to == OrderStatus::Paid {
            PaymentStatus::Paid
        } else {
            order.payment_status
        };

        let order = update_status(&mut tx, id, to, payment_status).await?;
        tx.commit().await.map_err(commerce_err)?;
        Ok(order)
    }
}

// =============================================================================
// Transaction helpers
// =============================================================================

async fn customer_exists(
    tx: &mut Transaction<'_, Postgres>,
    user_id: UserId,
    lock: bool,
) -> Result<bool, CommerceError> {
    let sql = if lock {
        "SELECT id FROM storefront.customer WHERE id = $1 FOR UPDATE"
    } else {
        "SELECT id FROM storefront.customer WHERE id = $1"
    };
    let row: Option<(i32,)> = sqlx::query_as(sql)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(commerce_err)?;
    Ok(row.is_some())
}

/// Lock the given products in ascending id order.
async fn lock_products(
    tx: &mut Transaction<'_, Postgres>,
    ids: &[ProductId],
) -> Result<BTreeMap<ProductId, Product>, CommerceError> {
    let mut ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
    ids.sort_unstable();
    ids.dedup();

    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM storefront.product \
         WHERE id = ANY($1) ORDER BY id FOR UPDATE"
    );
    let rows = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(&ids)
        .fetch_all(&mut **tx)
        .await
        .map_err(commerce_err)?;

    let mut products = BTreeMap::new();
    for row in rows {
        let product = Product::try_from(row)?;
        products.insert(product.id, product);
    }
    Ok(products)
}

/// Write staged `stock`/`reserved` values for rows locked by [`lock_products`].
async fn write_counters(
    tx: &mut Transaction<'_, Postgres>,
    staged: &[Product],
) -> Result<(), CommerceError> {
    for product in staged {
        sqlx::query(
            r"
            UPDATE storefront.product
            SET stock = $2, reserved = $3, updated_at = $4
            WHERE id = $1
            ",
        )
        .bind(product.id)
        .bind(bind_count(product.stock)?)
        .bind(bind_count(product.reserved)?)
        .bind(product.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(commerce_err)?;
    }
    Ok(())
}

async fn insert_order(
    tx: &mut Transaction<'_, Postgres>,
    order: &Order,
) -> Result<(), CommerceError> {
    sqlx::query(
        r#"
        INSERT INTO storefront."order" (
            id, order_number, user_id, items, items_version, subtotal, delivery_cost,
            final_amount, status, payment_status, delivery_address, delivery_type,
            payment_method, customer_notes, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        "#,
    )
    .bind(order.id)
    .bind(order.order_number.as_str())
    .bind(order.user_id)
    .bind(Json(&order.items))
    .bind(order.items_version)
    .bind(order.subtotal.amount())
    .bind(order.delivery_cost.amount())
    .bind(order.final_amount.amount())
    .bind(order.status)
    .bind(order.payment_status)
    .bind(&order.delivery_address)
    .bind(order.delivery_type)
    .bind(&order.payment_method)
    .bind(&order.customer_notes)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(commerce_err)?;
    Ok(())
}

async fn lock_order(
    tx: &mut Transaction<'_, Postgres>,
    id: OrderId,
) -> Result<Order, CommerceError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM storefront.\"order\" WHERE id = $1 FOR UPDATE");
    sqlx::query_as::<_, OrderRow>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(commerce_err)?
        .map(Order::from)
        .ok_or_else(|| CommerceError::not_found("order", id))
}

async fn update_status(
    tx: &mut Transaction<'_, Postgres>,
    id: OrderId,
    status: OrderStatus,
    payment_status: PaymentStatus,
) -> Result<Order, CommerceError> {
    let sql = format!(
        "UPDATE storefront.\"order\" \
         SET status = $2, payment_status = $3, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {ORDER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(id)
        .bind(status)
        .bind(payment_status)
        .fetch_one(&mut **tx)
        .await
        .map_err(commerce_err)?;
    Ok(row.into())
}
