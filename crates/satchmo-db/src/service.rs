//! # Order Service
//!
//! Connects the pricing rules in `satchmo-core` to storage.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  place_order(cart, shipping, "SPRING")                                 │
//! │       │                                                                 │
//! │       ├─► discounts.get_by_code ──► Discount::is_valid(cart, today)    │
//! │       │        invalid → code dropped, check returned to the caller    │
//! │       ├─► Order::from_cart                                             │
//! │       ├─► processor_from_config (TAX.MODULE)                           │
//! │       ├─► force_recalculate_total                                      │
//! │       └─► orders.insert                                                │
//! │                                                                         │
//! │  record_payment(..) ──► fully paid? → discount use + status Billed     │
//! │  recalculate(..)    ──► skipped once money was received (unless force) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Core calculations are synchronous. This layer loads what they need,
//! calls them and writes the results back.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::DbResult;
use crate::pool::Database;
use satchmo_core::cart::Cart;
use satchmo_core::configuration::{currency_format, ConfigurationSettings};
use satchmo_core::discount::{find_best_auto_discount, Discount, DiscountCheck, OrderDiscount};
use satchmo_core::order::{Order, OrderTotals};
use satchmo_core::tax::processor_from_config;
use satchmo_core::{Money, OrderStatus, Product, ValidationError};

/// Result of [`OrderService::place_order`].
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,

    /// Set when a code was supplied. A failed check means the code was
    /// dropped and the order priced without it.
    pub discount_check: Option<DiscountCheck>,
}

/// Checkout, recalculation and payment against the database.
#[derive(Debug, Clone)]
pub struct OrderService {
    db: Database,
}

impl OrderService {
    pub fn new(db: Database) -> Self {
        OrderService { db }
    }

    /// Turns a cart into a stored, priced order.
    ///
    /// ## Errors
    /// * `DbError::Validation` - the cart is empty
    /// * `DbError::Config` - the tax settings cannot be resolved
    pub async fn place_order(
        &self,
        cart: &Cart,
        shipping_cost: Money,
        discount_code: Option<&str>,
        config: &ConfigurationSettings,
        today: NaiveDate,
    ) -> DbResult<PlacedOrder> {
        if cart.is_empty() {
            return Err(ValidationError::Required {
                field: "cart".to_string(),
            }
            .into());
        }

        let code = discount_code.map(str::trim).filter(|c| !c.is_empty());
        let (discount, discount_check) = match code {
            Some(code) => self.check_code(code, cart, config, today).await?,
            None => (None, None),
        };

        let kept_code = discount.as_ref().map(|d| d.code.clone());
        let mut order = Order::from_cart(cart, shipping_cost, kept_code);
        order.status = OrderStatus::New;

        let mut discount = OrderDiscount::from(discount);
        let tax = processor_from_config(config)?;
        order.force_recalculate_total(&mut discount, tax.as_ref())?;

        self.db.orders().insert(&order).await?;
        info!(
            order_id = %order.id,
            total = %order.total,
            discount = %order.discount,
            "Order placed"
        );

        Ok(PlacedOrder {
            order,
            discount_check,
        })
    }

    async fn check_code(
        &self,
        code: &str,
        cart: &Cart,
        config: &ConfigurationSettings,
        today: NaiveDate,
    ) -> DbResult<(Option<Discount>, Option<DiscountCheck>)> {
        let Some(discount) = self.db.discounts().get_by_code(code).await? else {
            debug!(code, "Unknown discount code");
            return Ok((
                None,
                Some(DiscountCheck {
                    valid: false,
                    message: "This discount code is not valid.".to_string(),
                }),
            ));
        };

        let check = discount.is_valid(Some(cart), today, &currency_format(config));
        if check.valid {
            Ok((Some(discount), Some(check)))
        } else {
            warn!(code, reason = %check.message, "Discount code rejected");
            Ok((None, Some(check)))
        }
    }

    /// Recalculates a stored order against the current discount and tax
    /// settings.
    ///
    /// Without `force` nothing changes once a payment exists; the stored
    /// totals are returned as they are.
    pub async fn recalculate(
        &self,
        order_id: &str,
        config: &ConfigurationSettings,
        force: bool,
    ) -> DbResult<OrderTotals> {
        let orders = self.db.orders();
        let mut order = orders.get_required(order_id).await?;

        let found = match order.discount_code.as_deref() {
            Some(code) => self.db.discounts().find_active_by_code(code).await?,
            None => None,
        };
        let mut discount = OrderDiscount::from(found);
        let tax = processor_from_config(config)?;

        let ran = if force {
            order.force_recalculate_total(&mut discount, tax.as_ref())?;
            true
        } else {
            order.recalculate_total(&mut discount, tax.as_ref())?
        };

        if ran {
            orders.save_totals(&order).await?;
        }
        Ok(order.totals())
    }

    /// Records a payment. The payment that settles the balance counts a use
    /// of the order's discount and moves the order to `Billed`.
    pub async fn record_payment(
        &self,
        order_id: &str,
        payment: &str,
        amount: Money,
        transaction_id: Option<String>,
    ) -> DbResult<OrderTotals> {
        let orders = self.db.orders();
        let mut order = orders.get_required(order_id).await?;
        let was_paid = order.is_paid() && !order.payments.is_empty();

        let recorded = order.add_payment(payment, amount, transaction_id)?.clone();
        orders.add_payment(&order.id, &recorded).await?;

        if !was_paid && order.is_paid() {
            if let Some(code) = order.discount_code.as_deref() {
                self.db.discounts().record_use(code).await?;
            }
            orders.update_status(&order.id, OrderStatus::Billed).await?;
            order.status = OrderStatus::Billed;
            info!(order_id = %order.id, "Order paid in full");
        }

        Ok(order.totals())
    }

    /// Best automatic discount for a product, if automatic discounts are
    /// switched on (`DISCOUNT.AUTOMATIC`).
    pub async fn best_auto_discount(
        &self,
        product: &Product,
        config: &ConfigurationSettings,
        today: NaiveDate,
    ) -> DbResult<Option<Discount>> {
        if !config.config_bool("DISCOUNT", "AUTOMATIC")? {
            return Ok(None);
        }

        let discounts = self.db.discounts().list_automatic().await?;
        Ok(find_best_auto_discount(product, &discounts, today).cloned())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
