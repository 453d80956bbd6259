//! # Order Repository
//!
//! Orders with their lines, tax details and payments.
//!
//! ## Order Storage
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  orders ─┬── order_items        (product snapshot as JSON)             │
//! │          ├── order_tax_details  (replaced on every recalculation)      │
//! │          └── order_payments     (append only)                          │
//! │                                                                         │
//! │  insert()      → all four tables, one transaction                      │
//! │  save_totals() → order totals + item discounts + tax details           │
//! │  add_payment() → one payment row                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use satchmo_core::order::{Order, OrderItem, OrderPayment, OrderTaxDetail};
use satchmo_core::{Money, OrderStatus, Product};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    status: OrderStatus,
    shipping_cost_cents: i64,
    shipping_discount_cents: i64,
    discount_code: Option<String>,
    discount_cents: i64,
    sub_total_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    time_stamp: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: String,
    product: String,
    quantity: i64,
    unit_price_cents: i64,
    line_item_price_cents: i64,
    discount_cents: i64,
}

impl OrderItemRow {
    fn into_item(self) -> DbResult<OrderItem> {
        let product: Product = serde_json::from_str(&self.product)
            .map_err(|e| DbError::corrupt("order_item", &self.id, e))?;

        Ok(OrderItem {
            id: self.id,
            product,
            quantity: self.quantity,
            unit_price: Money::from_cents(self.unit_price_cents),
            line_item_price: Money::from_cents(self.line_item_price_cents),
            discount: Money::from_cents(self.discount_cents),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TaxDetailRow {
    method: String,
    description: String,
    tax_cents: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: String,
    payment: String,
    amount_cents: i64,
    transaction_id: Option<String>,
    time_stamp: DateTime<Utc>,
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts a complete order.
    pub async fn insert(&self, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, lines = order.items.len(), "Inserting order");
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, status, shipping_cost_cents, shipping_discount_cents,
                discount_code, discount_cents, sub_total_cents, tax_cents,
                total_cents, time_stamp, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8,
                ?9, ?10, ?11
            )
            "#,
        )
        .bind(&order.id)
        .bind(order.status)
        .bind(order.shipping_cost.cents())
        .bind(order.shipping_discount.cents())
        .bind(&order.discount_code)
        .bind(order.discount.cents())
        .bind(order.sub_total.cents())
        .bind(order.tax.cents())
        .bind(order.total.cents())
        .bind(order.time_stamp)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        for (position, item) in order.items.iter().enumerate() {
            let snapshot = serde_json::to_string(&item.product)
                .map_err(|e| DbError::corrupt("order_item", &item.id, e))?;

            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, position, product_id, sku, product,
                    quantity, unit_price_cents, line_item_price_cents, discount_cents
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6,
                    ?7, ?8, ?9, ?10
                )
                "#,
            )
            .bind(&item.id)
            .bind(&order.id)
            .bind(position as i64)
            .bind(&item.product.id)
            .bind(&item.product.sku)
            .bind(snapshot)
            .bind(item.quantity)
            .bind(item.unit_price.cents())
            .bind(item.line_item_price.cents())
            .bind(item.discount.cents())
            .execute(&mut *tx)
            .await?;
        }

        insert_tax_details(&mut tx, &order.id, &order.tax_details).await?;

        for payment in &order.payments {
            insert_payment(&mut tx, &order.id, payment).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Gets an order with lines, tax details and payments.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT
                id, status, shipping_cost_cents, shipping_discount_cents,
                discount_code, discount_cents, sub_total_cents, tax_cents,
                total_cents, time_stamp
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = self.get_items(id).await?;
        let tax_details = self.get_tax_details(id).await?;
        let payments = self.get_payments(id).await?;

        Ok(Some(Order {
            id: row.id,
            status: row.status,
            items,
            shipping_cost: Money::from_cents(row.shipping_cost_cents),
            shipping_discount: Money::from_cents(row.shipping_discount_cents),
            discount_code: row.discount_code,
            discount: Money::from_cents(row.discount_cents),
            sub_total: Money::from_cents(row.sub_total_cents),
            tax: Money::from_cents(row.tax_cents),
            total: Money::from_cents(row.total_cents),
            tax_details,
            payments,
            time_stamp: row.time_stamp,
        }))
    }

    /// Like [`get_by_id`](Self::get_by_id) but fails with `NotFound`.
    pub async fn get_required(&self, id: &str) -> DbResult<Order> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))
    }

    /// Gets the lines of an order in insertion order.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let rows: Vec<OrderItemRow> = sqlx::query_as(
            r#"
            SELECT id, product, quantity, unit_price_cents, line_item_price_cents, discount_cents
            FROM order_items
            WHERE order_id = ?1
            ORDER BY position
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OrderItemRow::into_item).collect()
    }

    pub async fn get_tax_details(&self, order_id: &str) -> DbResult<Vec<OrderTaxDetail>> {
        let rows: Vec<TaxDetailRow> = sqlx::query_as(
            r#"
            SELECT method, description, tax_cents
            FROM order_tax_details
            WHERE order_id = ?1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| OrderTaxDetail {
                method: r.method,
                description: r.description,
                tax: Money::from_cents(r.tax_cents),
            })
            .collect())
    }

    pub async fn get_payments(&self, order_id: &str) -> DbResult<Vec<OrderPayment>> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, payment, amount_cents, transaction_id, time_stamp
            FROM order_payments
            WHERE order_id = ?1
            ORDER BY time_stamp, id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| OrderPayment {
                id: r.id,
                payment: r.payment,
                amount: Money::from_cents(r.amount_cents),
                transaction_id: r.transaction_id,
                time_stamp: r.time_stamp,
            })
            .collect())
    }

    /// Writes the results of a recalculation.
    ///
    /// Order totals, every line's discount and a fresh set of tax details
    /// (old ones deleted first), in one transaction.
    pub async fn save_totals(&self, order: &Order) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                shipping_cost_cents = ?2,
                shipping_discount_cents = ?3,
                discount_code = ?4,
                discount_cents = ?5,
                sub_total_cents = ?6,
                tax_cents = ?7,
                total_cents = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&order.id)
        .bind(order.shipping_cost.cents())
        .bind(order.shipping_discount.cents())
        .bind(&order.discount_code)
        .bind(order.discount.cents())
        .bind(order.sub_total.cents())
        .bind(order.tax.cents())
        .bind(order.total.cents())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", &order.id));
        }

        for item in &order.items {
            sqlx::query("UPDATE order_items SET discount_cents = ?2 WHERE id = ?1")
                .bind(&item.id)
                .bind(item.discount.cents())
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM order_tax_details WHERE order_id = ?1")
            .bind(&order.id)
            .execute(&mut *tx)
            .await?;
        insert_tax_details(&mut tx, &order.id, &order.tax_details).await?;

        tx.commit().await?;
        debug!(id = %order.id, total = %order.total, "Order totals saved");
        Ok(())
    }

    /// Appends a payment row.
    pub async fn add_payment(&self, order_id: &str, payment: &OrderPayment) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        insert_payment(&mut tx, order_id, payment).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Sum of payments received.
    pub async fn get_total_paid(&self, order_id: &str) -> DbResult<Money> {
        let cents: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM order_payments WHERE order_id = ?1",
        )
        .bind(order_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::from_cents(cents))
    }

    pub async fn update_status(&self, order_id: &str, status: OrderStatus) -> DbResult<()> {
        let result = sqlx::query("UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(order_id)
            .bind(status)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", order_id));
        }

        debug!(id = %order_id, %status, "Order status updated");
        Ok(())
    }
}

async fn insert_tax_details(
    tx: &mut Transaction<'_, Sqlite>,
    order_id: &str,
    details: &[OrderTaxDetail],
) -> DbResult<()> {
    for detail in details {
        sqlx::query(
            r#"
            INSERT INTO order_tax_details (order_id, method, description, tax_cents)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(order_id)
        .bind(&detail.method)
        .bind(&detail.description)
        .bind(detail.tax.cents())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn insert_payment(
    tx: &mut Transaction<'_, Sqlite>,
    order_id: &str,
    payment: &OrderPayment,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_payments (id, order_id, payment, amount_cents, transaction_id, time_stamp)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&payment.id)
    .bind(order_id)
    .bind(&payment.payment)
    .bind(payment.amount.cents())
    .bind(&payment.transaction_id)
    .bind(payment.time_stamp)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
