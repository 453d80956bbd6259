//! # Order
//!
//! A placed (or being-placed) order and its totals.
//!
//! ## Total Recalculation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  recalculate_total(discount, tax)                                       │
//! │       │                                                                 │
//! │       ├── is_partially_paid? ──► no-op (totals are frozen)             │
//! │       ▼                                                                 │
//! │  force_recalculate_total(discount, tax)                                 │
//! │    1. discount.calc(order)                                              │
//! │    2. order.discount      = discount.total                             │
//! │    3. item.discount       = item_discounts[item.id]      (or 0)        │
//! │    4. shipping_discount   = item_discounts[Shipping]     (or 0)        │
//! │    5. sub_total           = Σ line_item_price            (undiscounted) │
//! │    6. tax, tax_details    = tax.process(order)                         │
//! │    7. total = Σ item.sub_total + shipping_sub_total + tax              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `item.sub_total()` and `shipping_sub_total()` are derived, so
//! `sub_total = line_item_price − discount` can never drift.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ts_rs::TS;
use uuid::Uuid;

use crate::cart::{Cart, CartItem};
use crate::discount::{DiscountKey, OrderDiscount};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::tax::TaxProcessor;
use crate::types::{OrderStatus, Product};
use crate::validation::validate_payment_amount;

// =============================================================================
// Order Items
// =============================================================================

/// One line of an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: String,

    /// Product snapshot at checkout.
    pub product: Product,

    pub quantity: i64,

    pub unit_price: Money,

    /// unit_price × quantity
    pub line_item_price: Money,

    /// Discount allocated to this line by the last recalculation.
    pub discount: Money,
}

impl OrderItem {
    pub fn new(product: &Product, quantity: i64) -> Self {
        OrderItem {
            id: Uuid::new_v4().to_string(),
            product: product.clone(),
            quantity,
            unit_price: product.price,
            line_item_price: product.price.multiply_quantity(quantity),
            discount: Money::zero(),
        }
    }

    pub fn from_cart_item(item: &CartItem) -> Self {
        OrderItem {
            id: Uuid::new_v4().to_string(),
            product: item.product.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price(),
            line_item_price: item.line_total(),
            discount: Money::zero(),
        }
    }

    /// Line price after discount.
    pub fn sub_total(&self) -> Money {
        self.line_item_price - self.discount
    }
}

/// Tax charged for one tax class (or for shipping).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTaxDetail {
    /// Key of the tax module that produced the row.
    pub method: String,
    /// Tax class or `Shipping`.
    pub description: String,
    pub tax: Money,
}

/// Money received against an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPayment {
    pub id: String,
    /// Payment module key, e.g. `PAYMENT_DUMMY`.
    pub payment: String,
    pub amount: Money,
    pub transaction_id: Option<String>,
    pub time_stamp: DateTime<Utc>,
}

/// Totals snapshot for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderTotals {
    pub sub_total: Money,
    pub discount: Money,
    pub shipping_cost: Money,
    pub shipping_discount: Money,
    pub tax: Money,
    pub total: Money,
    pub balance: Money,
}

// =============================================================================
// Order
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub shipping_cost: Money,
    pub shipping_discount: Money,
    pub discount_code: Option<String>,

    /// Total discount, shipping included.
    pub discount: Money,

    /// Σ line_item_price, before discounts.
    pub sub_total: Money,
    pub tax: Money,
    pub total: Money,
    pub tax_details: Vec<OrderTaxDetail>,
    pub payments: Vec<OrderPayment>,
    pub time_stamp: DateTime<Utc>,
}

impl Order {
    pub fn new(shipping_cost: Money, discount_code: Option<String>) -> Self {
        Order {
            id: Uuid::new_v4().to_string(),
            status: OrderStatus::Temp,
            items: Vec::new(),
            shipping_cost,
            shipping_discount: Money::zero(),
            discount_code,
            discount: Money::zero(),
            sub_total: Money::zero(),
            tax: Money::zero(),
            total: Money::zero(),
            tax_details: Vec::new(),
            payments: Vec::new(),
            time_stamp: Utc::now(),
        }
    }

    /// Builds an order from the cart contents. Totals are not computed yet.
    pub fn from_cart(cart: &Cart, shipping_cost: Money, discount_code: Option<String>) -> Self {
        let mut order = Order::new(shipping_cost, discount_code);
        order.items = cart.items.iter().map(OrderItem::from_cart_item).collect();
        debug!(order_id = %order.id, lines = order.items.len(), "Order created from cart");
        order
    }

    pub fn add_item(&mut self, product: &Product, quantity: i64) -> &OrderItem {
        self.items.push(OrderItem::new(product, quantity));
        &self.items[self.items.len() - 1]
    }

    pub fn shipping_sub_total(&self) -> Money {
        self.shipping_cost - self.shipping_discount
    }

    /// Σ item sub_totals (discounted).
    pub fn item_sub_total(&self) -> Money {
        self.items.iter().map(OrderItem::sub_total).sum()
    }

    /// Whether any item needs physical shipping.
    pub fn is_shippable(&self) -> bool {
        self.items.iter().any(|i| i.product.is_shippable())
    }

    // =========================================================================
    // Payments
    // =========================================================================

    pub fn balance_paid(&self) -> Money {
        self.payments.iter().map(|p| p.amount).sum()
    }

    pub fn balance(&self) -> Money {
        self.total - self.balance_paid()
    }

    pub fn is_paid(&self) -> bool {
        !self.balance().is_positive()
    }

    /// Any money received. Totals are frozen from this point on.
    pub fn is_partially_paid(&self) -> bool {
        self.balance_paid().is_positive()
    }

    /// Records a payment against the order.
    pub fn add_payment(
        &mut self,
        payment: impl Into<String>,
        amount: Money,
        transaction_id: Option<String>,
    ) -> CoreResult<&OrderPayment> {
        if self.status == OrderStatus::Cancelled {
            return Err(CoreError::InvalidOrderStatus {
                order_id: self.id.clone(),
                current_status: self.status.to_string(),
            });
        }
        validate_payment_amount(amount.cents())?;

        self.payments.push(OrderPayment {
            id: Uuid::new_v4().to_string(),
            payment: payment.into(),
            amount,
            transaction_id,
            time_stamp: Utc::now(),
        });
        info!(order_id = %self.id, %amount, balance = %self.balance(), "Payment recorded");
        Ok(&self.payments[self.payments.len() - 1])
    }

    // =========================================================================
    // Totals
    // =========================================================================

    /// Recalculates totals unless money has already been received.
    ///
    /// Returns `false` when skipped.
    pub fn recalculate_total(
        &mut self,
        discount: &mut OrderDiscount,
        tax: &dyn TaxProcessor,
    ) -> CoreResult<bool> {
        if self.is_partially_paid() {
            debug!(order_id = %self.id, "Order partially paid, totals frozen");
            return Ok(false);
        }
        self.force_recalculate_total(discount, tax)?;
        Ok(true)
    }

    /// Recalculates discount, tax and total unconditionally.
    pub fn force_recalculate_total(
        &mut self,
        discount: &mut OrderDiscount,
        tax: &dyn TaxProcessor,
    ) -> CoreResult<()> {
        discount.calc(self);
        self.discount = discount.total()?;

        let splits = discount.item_discounts()?;
        for item in &mut self.items {
            item.discount = splits
                .get(&DiscountKey::Item(item.id.clone()))
                .copied()
                .unwrap_or_default();
        }
        self.shipping_discount = splits
            .get(&DiscountKey::Shipping)
            .copied()
            .unwrap_or_default();

        self.sub_total = self.items.iter().map(|i| i.line_item_price).sum();

        let (total_tax, breakdown) = tax.process(self);
        self.tax = total_tax;
        self.tax_details = tax_details(tax.key(), breakdown);

        self.total = self.item_sub_total() + self.shipping_sub_total() + self.tax;

        debug!(
            order_id = %self.id,
            discount = %self.discount,
            tax = %self.tax,
            total = %self.total,
            "Order totals recalculated"
        );
        Ok(())
    }

    pub fn totals(&self) -> OrderTotals {
        OrderTotals {
            sub_total: self.sub_total,
            discount: self.discount,
            shipping_cost: self.shipping_cost,
            shipping_discount: self.shipping_discount,
            tax: self.tax,
            total: self.total,
            balance: self.balance(),
        }
    }
}

fn tax_details(method: &str, breakdown: BTreeMap<String, Money>) -> Vec<OrderTaxDetail> {
    breakdown
        .into_iter()
        .map(|(description, tax)| OrderTaxDetail {
            method: method.to_string(),
            description,
            tax,
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discount::{find_discount_for_code, Discount};
    use crate::tax::{NoTax, PercentTax};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn coupon(code: &str) -> Discount {
        Discount::new(
            code,
            "Test",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        )
    }

    fn two_line_order(shipping: i64, code: Option<&str>) -> Order {
        let mut order = Order::new(Money::from_cents(shipping), code.map(str::to_string));
        order.add_item(&Product::new("A", "Ten", Money::from_cents(1000)), 1);
        order.add_item(&Product::new("B", "Twenty", Money::from_cents(2000)), 1);
        order
    }

    #[test]
    fn test_flat_discount_end_to_end() {
        let discounts = vec![coupon("SIX").with_amount(Money::from_cents(600))];
        let mut order = two_line_order(500, Some("SIX"));
        let mut discount = find_discount_for_code(order.discount_code.as_deref(), &discounts);

        order.force_recalculate_total(&mut discount, &NoTax).unwrap();

        let d1 = order.items[0].discount;
        let d2 = order.items[1].discount;
        assert_eq!((d1 + d2).cents(), 600);
        assert_eq!(order.discount.cents(), 600);
        assert_eq!(order.sub_total.cents(), 3000);
        assert_eq!(order.shipping_discount, Money::zero());
        assert_eq!(
            order.total,
            (Money::from_cents(1000) - d1) + (Money::from_cents(2000) - d2) + Money::from_cents(500)
        );
        assert_eq!(order.total.cents(), 2900);
    }

    #[test]
    fn test_free_shipping_regardless_of_include_shipping() {
        for include in [false, true] {
            let mut d = coupon("SHIPFREE").with_free_shipping();
            d.include_shipping = include;
            let discounts = vec![d];

            let mut order = two_line_order(500, Some("SHIPFREE"));
            let mut discount = find_discount_for_code(Some("SHIPFREE"), &discounts);
            order.force_recalculate_total(&mut discount, &NoTax).unwrap();

            assert_eq!(order.shipping_discount.cents(), 500);
            assert_eq!(order.shipping_sub_total(), Money::zero());
            assert_eq!(order.discount.cents(), 500);
            assert_eq!(order.total.cents(), 3000);
        }
    }

    #[test]
    fn test_percentage_with_shipping_included() {
        let discounts = vec![coupon("TENPCT")
            .with_percentage(Decimal::from(10))
            .with_shipping_included()];
        let mut order = two_line_order(500, Some("TENPCT"));
        let mut discount = find_discount_for_code(Some("TENPCT"), &discounts);

        order.force_recalculate_total(&mut discount, &NoTax).unwrap();

        assert_eq!(order.items[0].discount.cents(), 100);
        assert_eq!(order.items[1].discount.cents(), 200);
        assert_eq!(order.shipping_discount.cents(), 50);
        assert_eq!(order.total.cents(), 3150);
    }

    #[test]
    fn test_no_code_means_no_discount() {
        let mut order = two_line_order(500, None);
        let mut discount = find_discount_for_code(None, &[]);

        order.force_recalculate_total(&mut discount, &NoTax).unwrap();

        assert_eq!(order.discount, Money::zero());
        assert_eq!(order.total.cents(), 3500);
        assert!(order.tax_details.is_empty());
    }

    #[test]
    fn test_tax_applied_to_discounted_lines() {
        let discounts = vec![coupon("SIX").with_amount(Money::from_cents(600))];
        let mut order = two_line_order(500, Some("SIX"));
        let mut discount = find_discount_for_code(Some("SIX"), &discounts);
        let tax = PercentTax::new(Decimal::from(10), false);

        order.force_recalculate_total(&mut discount, &tax).unwrap();

        // 10% of (3000 - 600)
        assert_eq!(order.tax.cents(), 240);
        assert_eq!(order.tax_details.len(), 1);
        assert_eq!(order.tax_details[0].method, "tax.modules.percent");
        assert_eq!(order.total.cents(), 2400 + 500 + 240);
    }

    #[test]
    fn test_force_recalculate_is_idempotent() {
        let discounts = vec![coupon("SIX").with_amount(Money::from_cents(600))];
        let mut order = two_line_order(500, Some("SIX"));
        let mut discount = find_discount_for_code(Some("SIX"), &discounts);
        let tax = PercentTax::new(Decimal::new(825, 2), true);

        order.force_recalculate_total(&mut discount, &tax).unwrap();
        let first = order.totals();
        order.force_recalculate_total(&mut discount, &tax).unwrap();

        assert_eq!(order.totals(), first);
        assert_eq!(order.tax_details.len(), 2);
    }

    #[test]
    fn test_partially_paid_order_is_frozen() {
        let discounts = vec![coupon("SIX").with_amount(Money::from_cents(600))];
        let mut order = two_line_order(500, Some("SIX"));
        let mut discount = find_discount_for_code(Some("SIX"), &discounts);

        assert!(order.recalculate_total(&mut discount, &NoTax).unwrap());
        let before = order.total;

        order
            .add_payment("PAYMENT_DUMMY", Money::from_cents(1000), None)
            .unwrap();
        assert!(order.is_partially_paid());
        assert!(!order.is_paid());

        order.shipping_cost = Money::from_cents(5000);
        assert!(!order.recalculate_total(&mut discount, &NoTax).unwrap());
        assert_eq!(order.total, before);

        order.force_recalculate_total(&mut discount, &NoTax).unwrap();
        assert_ne!(order.total, before);
    }

    #[test]
    fn test_payments_and_balance() {
        let mut order = two_line_order(0, None);
        let mut discount = find_discount_for_code(None, &[]);
        order.force_recalculate_total(&mut discount, &NoTax).unwrap();

        assert!(order.add_payment("PAYMENT_DUMMY", Money::zero(), None).is_err());

        order
            .add_payment("PAYMENT_DUMMY", Money::from_cents(3000), Some("TX-1".into()))
            .unwrap();
        assert_eq!(order.balance(), Money::zero());
        assert!(order.is_paid());

        order.status = OrderStatus::Cancelled;
        assert!(matches!(
            order.add_payment("PAYMENT_DUMMY", Money::from_cents(1), None),
            Err(CoreError::InvalidOrderStatus { .. })
        ));
    }

    #[test]
    fn test_from_cart() {
        let mut cart = Cart::new();
        let tee = Product::new("TEE", "T-Shirt", Money::from_cents(1500));
        cart.add_item(&tee, 2).unwrap();

        let order = Order::from_cart(&cart, Money::from_cents(700), Some("X".into()));
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].line_item_price.cents(), 3000);
        assert_eq!(order.status, OrderStatus::Temp);
        assert!(order.is_shippable());
    }
}
