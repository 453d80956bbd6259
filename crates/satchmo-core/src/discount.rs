//! # Discount Engine
//!
//! Turns an order plus an optional coupon into a per-line discount map.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Order lines ──► eligible? ──► { line id → line_item_price }           │
//! │                                      │                                  │
//! │  include_shipping && !free_shipping ─┼─► { Shipping → shipping_cost }  │
//! │                                      ▼                                  │
//! │              amount?  ──► apply_even_split(discounted, amount)         │
//! │              percent? ──► apply_percentage(discounted, percentage)     │
//! │              neither  ──► every entry = 0                              │
//! │                                      │                                  │
//! │  free_shipping ──────────────────────┼─► { Shipping → shipping_cost }  │
//! │                                      ▼                                  │
//! │                          item_discounts (calculated)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Validity
//! `is_valid` is not an error path. It returns a [`DiscountCheck`] whose
//! message is shown to the shopper as-is.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{CurrencyFormat, Money};
use crate::order::Order;
use crate::types::Product;
use crate::validation::{
    validate_discount_code, validate_payment_amount, validate_percentage, ValidationResult,
};

/// Closing tolerance of the even-split allocator.
const SPLIT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

// =============================================================================
// Discount Keys and Results
// =============================================================================

/// Key of one entry in a discount map: an order line or the shipping charge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKey {
    /// An order line, by `OrderItem::id`.
    Item(String),
    Shipping,
}

impl fmt::Display for DiscountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscountKey::Item(id) => write!(f, "{}", id),
            DiscountKey::Shipping => write!(f, "Shipping"),
        }
    }
}

/// Per-line discount amounts.
pub type DiscountMap = BTreeMap<DiscountKey, Money>;

/// Outcome of [`Discount::is_valid`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountCheck {
    pub valid: bool,
    pub message: String,
}

impl DiscountCheck {
    fn pass() -> Self {
        DiscountCheck {
            valid: true,
            message: "Valid.".to_string(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        DiscountCheck {
            valid: false,
            message: message.into(),
        }
    }
}

// =============================================================================
// Discount
// =============================================================================

/// A coupon: a flat amount or a percentage off, with an optional free
/// shipping component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discount {
    pub id: String,

    /// Coupon code typed by the shopper. Unique.
    pub code: String,

    pub description: String,

    /// Flat amount split across eligible lines. Exclusive with `percentage`.
    pub amount: Option<Money>,

    /// Percentage off, either as a fraction (`0.10`) or whole (`10`).
    pub percentage: Option<Decimal>,

    /// Applied without the shopper entering the code.
    pub automatic: bool,

    /// Maximum number of uses (`None` = unlimited).
    pub allowed_uses: Option<i64>,

    pub num_uses: i64,

    /// Minimum cart total for the coupon to apply.
    pub min_order: Option<Money>,

    /// First day the coupon is valid.
    pub start_date: NaiveDate,

    /// Last day the coupon is valid.
    pub end_date: NaiveDate,

    pub active: bool,

    /// The whole shipping charge is discounted.
    pub free_shipping: bool,

    /// Shipping takes part in the amount/percentage split.
    pub include_shipping: bool,

    /// Product ids the coupon is limited to. Empty = every discountable product.
    pub valid_products: BTreeSet<String>,

    #[serde(skip)]
    item_discounts: Option<DiscountMap>,
}

impl Discount {
    /// Creates an active coupon with no amount, percentage or restrictions.
    pub fn new(
        code: impl Into<String>,
        description: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Discount {
            id: Uuid::new_v4().to_string(),
            code: code.into(),
            description: description.into(),
            amount: None,
            percentage: None,
            automatic: false,
            allowed_uses: None,
            num_uses: 0,
            min_order: None,
            start_date,
            end_date,
            active: true,
            free_shipping: false,
            include_shipping: false,
            valid_products: BTreeSet::new(),
            item_discounts: None,
        }
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_percentage(mut self, percentage: Decimal) -> Self {
        self.percentage = Some(percentage);
        self
    }

    pub fn with_allowed_uses(mut self, allowed: i64) -> Self {
        self.allowed_uses = Some(allowed);
        self
    }

    pub fn with_min_order(mut self, min_order: Money) -> Self {
        self.min_order = Some(min_order);
        self
    }

    pub fn with_free_shipping(mut self) -> Self {
        self.free_shipping = true;
        self
    }

    pub fn with_shipping_included(mut self) -> Self {
        self.include_shipping = true;
        self
    }

    pub fn automatic(mut self) -> Self {
        self.automatic = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Limits the coupon to the given product ids.
    pub fn with_valid_products<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.valid_products = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Checks the coupon definition before it is stored.
    ///
    /// ## Rules
    /// - code: non-empty, at most 20 characters, `[A-Za-z0-9_-]`
    /// - `amount` and `percentage` are mutually exclusive
    /// - amount > 0, percentage in (0, 100]
    /// - `end_date` not before `start_date`
    pub fn validate(&self) -> ValidationResult<()> {
        validate_discount_code(&self.code)?;

        if self.amount.is_some() && self.percentage.is_some() {
            return Err(ValidationError::MutuallyExclusive {
                first: "amount".to_string(),
                second: "percentage".to_string(),
            });
        }

        if let Some(amount) = self.amount {
            validate_payment_amount(amount.cents()).map_err(|_| {
                ValidationError::MustBePositive {
                    field: "amount".to_string(),
                }
            })?;
        }

        if let Some(percentage) = self.percentage {
            validate_percentage(percentage)?;
        }

        if self.end_date < self.start_date {
            return Err(ValidationError::InvalidFormat {
                field: "end_date".to_string(),
                reason: "must not be before start_date".to_string(),
            });
        }

        Ok(())
    }

    // =========================================================================
    // Validity
    // =========================================================================

    /// Whether the coupon can be used today, optionally against a cart.
    ///
    /// Checks run in a fixed order and stop at the first failure, so a
    /// disabled coupon reports "disabled" even when it has also expired.
    pub fn is_valid(
        &self,
        cart: Option<&Cart>,
        today: NaiveDate,
        currency: &CurrencyFormat,
    ) -> DiscountCheck {
        if !self.active {
            return DiscountCheck::fail("This coupon is disabled.");
        }
        if self.start_date > today {
            return DiscountCheck::fail("This coupon is not active yet.");
        }
        if self.end_date < today {
            return DiscountCheck::fail("This coupon has expired.");
        }
        if let Some(allowed) = self.allowed_uses {
            if self.num_uses > allowed {
                return DiscountCheck::fail(
                    "This discount has exceeded the number of allowed uses.",
                );
            }
        }

        let Some(cart) = cart else {
            return DiscountCheck::pass();
        };

        if let Some(min_order) = self.min_order {
            if cart.total() < min_order {
                return DiscountCheck::fail(format!(
                    "This discount only applies to orders of at least {}.",
                    currency.format(min_order)
                ));
            }
        }

        // An unrestricted coupon is eligible for any cart.
        if !self.valid_products.is_empty() {
            let eligible = cart
                .items
                .iter()
                .any(|item| self.applies_to(&item.product));
            if !eligible {
                return DiscountCheck::fail(
                    "This discount cannot be applied to the products in your cart.",
                );
            }
        }

        DiscountCheck::pass()
    }

    /// Whether the coupon may reduce this product's price.
    pub fn applies_to(&self, product: &Product) -> bool {
        product.is_discountable()
            && (self.valid_products.is_empty() || self.valid_products.contains(&product.id))
    }

    // =========================================================================
    // Calculation
    // =========================================================================

    /// Computes the discount for every line of the order.
    pub fn calc(&mut self, order: &Order) {
        let mut discounted: BTreeMap<DiscountKey, Decimal> = order
            .items
            .iter()
            .filter(|item| self.applies_to(&item.product))
            .map(|item| {
                (
                    DiscountKey::Item(item.id.clone()),
                    item.line_item_price.to_decimal(),
                )
            })
            .collect();

        if self.include_shipping && !self.free_shipping {
            discounted.insert(DiscountKey::Shipping, order.shipping_cost.to_decimal());
        }

        let mut result = if let Some(amount) = self.amount {
            apply_even_split(&discounted, amount)
        } else if let Some(percentage) = self.percentage {
            apply_percentage(&discounted, percentage)
        } else {
            discounted
                .into_keys()
                .map(|key| (key, Money::zero()))
                .collect()
        };

        if self.free_shipping {
            result.insert(DiscountKey::Shipping, order.shipping_cost);
        }

        debug!(
            code = %self.code,
            order_id = %order.id,
            lines = result.len(),
            "Calculated discount"
        );
        self.item_discounts = Some(result);
    }

    /// Whether `calc` has run.
    pub fn is_calculated(&self) -> bool {
        self.item_discounts.is_some()
    }

    /// Per-line discounts from the last `calc`.
    pub fn item_discounts(&self) -> CoreResult<&DiscountMap> {
        self.item_discounts
            .as_ref()
            .ok_or_else(|| CoreError::DiscountNotCalculated {
                code: self.code.clone(),
            })
    }

    /// Sum of every entry, shipping included.
    pub fn total(&self) -> CoreResult<Money> {
        Ok(self.item_discounts()?.values().sum())
    }

    /// Counts one more use of the coupon.
    pub fn record_use(&mut self) {
        self.num_uses += 1;
        info!(code = %self.code, num_uses = self.num_uses, "Discount used");
    }
}

// =============================================================================
// Allocation
// =============================================================================

/// Spreads a flat `amount` over the entries without any entry going below zero.
///
/// Each pass gives every entry the current average share. Entries priced at
/// or below the share are consumed whole and the remaining amount is
/// re-averaged over the others. Stops once the applied total is within a
/// cent of `amount`, when a pass consumes nothing new, or when every entry
/// is consumed. Results are rounded half-up to the cent.
///
/// ## Example
/// ```rust
/// use std::collections::BTreeMap;
/// use rust_decimal::Decimal;
/// use satchmo_core::discount::{apply_even_split, DiscountKey};
///
/// let mut lines = BTreeMap::new();
/// lines.insert(DiscountKey::Item("a".into()), Decimal::from(10));
/// lines.insert(DiscountKey::Item("b".into()), Decimal::from(20));
///
/// let split = apply_even_split(&lines, satchmo_core::Money::from_cents(600));
/// assert_eq!(split[&DiscountKey::Item("a".into())].cents(), 300);
/// ```
pub fn apply_even_split(
    discounted: &BTreeMap<DiscountKey, Decimal>,
    amount: Money,
) -> DiscountMap {
    let total_count = discounted.len();
    if total_count == 0 {
        return DiscountMap::new();
    }

    let amount = amount.to_decimal();
    let mut split = amount / Decimal::from(total_count);
    let mut last_count: Option<usize> = None;
    let mut work: BTreeMap<&DiscountKey, Decimal> = BTreeMap::new();

    loop {
        let mut delta = Decimal::ZERO;
        let mut applied = Decimal::ZERO;
        let mut remaining = total_count;
        work.clear();

        for (key, price) in discounted {
            if *price > split {
                work.insert(key, split);
                applied += split;
            } else {
                work.insert(key, *price);
                delta += *price;
                applied += *price;
                remaining -= 1;
            }
        }

        debug!(%split, %applied, remaining, "Even split pass");

        if applied >= amount - SPLIT_TOLERANCE
            || remaining == 0
            || last_count == Some(remaining)
        {
            break;
        }

        last_count = Some(remaining);
        split = (amount - delta) / Decimal::from(remaining);
    }

    work.into_iter()
        .map(|(key, value)| (key.clone(), Money::from_decimal_half_up(value)))
        .collect()
}

/// Takes `percentage` off every entry, rounding half-up to the cent.
///
/// A percentage above 1 is read as a whole-number percentage and divided by
/// 100, as often as needed, so `110` and `1.10` both mean 1.1%.
pub fn apply_percentage(
    discounted: &BTreeMap<DiscountKey, Decimal>,
    percentage: Decimal,
) -> DiscountMap {
    let fraction = normalize_percentage(percentage);

    discounted
        .iter()
        .map(|(key, value)| (key.clone(), Money::from_decimal_half_up(*value * fraction)))
        .collect()
}

fn normalize_percentage(percentage: Decimal) -> Decimal {
    let mut fraction = percentage;
    while fraction > Decimal::ONE {
        let corrected = fraction / Decimal::ONE_HUNDRED;
        warn!(
            %percentage,
            from = %fraction,
            to = %corrected,
            "Correcting discount percentage, it should be at most 1"
        );
        fraction = corrected;
    }
    fraction
}

// =============================================================================
// Lookup
// =============================================================================

/// A discount that never discounts anything. Always calculated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NullDiscount {
    item_discounts: DiscountMap,
}

/// The discount attached to an order: a real coupon or the null sentinel.
#[derive(Debug, Clone)]
pub enum OrderDiscount {
    Code(Box<Discount>),
    Null(NullDiscount),
}

impl OrderDiscount {
    pub fn code(&self) -> Option<&str> {
        match self {
            OrderDiscount::Code(d) => Some(&d.code),
            OrderDiscount::Null(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, OrderDiscount::Null(_))
    }

    pub fn calc(&mut self, order: &Order) {
        match self {
            OrderDiscount::Code(d) => d.calc(order),
            OrderDiscount::Null(_) => {}
        }
    }

    pub fn item_discounts(&self) -> CoreResult<&DiscountMap> {
        match self {
            OrderDiscount::Code(d) => d.item_discounts(),
            OrderDiscount::Null(n) => Ok(&n.item_discounts),
        }
    }

    pub fn total(&self) -> CoreResult<Money> {
        match self {
            OrderDiscount::Code(d) => d.total(),
            OrderDiscount::Null(_) => Ok(Money::zero()),
        }
    }
}

impl From<Option<Discount>> for OrderDiscount {
    fn from(discount: Option<Discount>) -> Self {
        match discount {
            Some(d) => OrderDiscount::Code(Box::new(d)),
            None => OrderDiscount::Null(NullDiscount::default()),
        }
    }
}

/// Picks the active discount with this code, or the null discount.
///
/// An empty or missing code always yields the null discount.
pub fn find_discount_for_code<'a, I>(code: Option<&str>, candidates: I) -> OrderDiscount
where
    I: IntoIterator<Item = &'a Discount>,
{
    let code = match code.map(str::trim) {
        Some(c) if !c.is_empty() => c,
        _ => return OrderDiscount::from(None),
    };

    let found = candidates
        .into_iter()
        .find(|d| d.active && d.code == code)
        .cloned();
    if found.is_none() {
        debug!(code, "No active discount for code");
    }
    OrderDiscount::from(found)
}

/// Best automatic discount for a product: the valid automatic percentage
/// discount covering it with the largest percentage.
pub fn find_best_auto_discount<'a>(
    product: &Product,
    discounts: &'a [Discount],
    today: NaiveDate,
) -> Option<&'a Discount> {
    let currency = CurrencyFormat::default();
    discounts
        .iter()
        .filter(|d| d.automatic && d.applies_to(product))
        .filter(|d| d.is_valid(None, today, &currency).valid)
        .filter_map(|d| d.percentage.map(|p| (normalize_percentage(p), d)))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, d)| d)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProductKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2024, 6, 15)
    }

    fn coupon(code: &str) -> Discount {
        Discount::new(code, "Test coupon", date(2024, 1, 1), date(2024, 12, 31))
    }

    fn lines(values: &[(&str, i64)]) -> BTreeMap<DiscountKey, Decimal> {
        values
            .iter()
            .map(|(k, v)| (DiscountKey::Item(k.to_string()), Decimal::from(*v)))
            .collect()
    }

    fn cents(map: &DiscountMap, key: &str) -> i64 {
        map[&DiscountKey::Item(key.to_string())].cents()
    }

    fn cart_with(products: &[&Product]) -> Cart {
        let mut cart = Cart::new();
        for p in products {
            cart.add_item(p, 1).unwrap();
        }
        cart
    }

    #[test]
    fn test_even_split_consumes_cheap_line() {
        let split = apply_even_split(&lines(&[("a", 10), ("b", 20), ("c", 5)]), Money::from_cents(1500));

        assert_eq!(cents(&split, "a"), 500);
        assert_eq!(cents(&split, "b"), 500);
        assert_eq!(cents(&split, "c"), 500);
        assert_eq!(split.values().sum::<Money>().cents(), 1500);
    }

    #[test]
    fn test_even_split_respreads_excess() {
        let split = apply_even_split(&lines(&[("a", 10), ("b", 20), ("c", 5)]), Money::from_cents(3000));

        assert_eq!(cents(&split, "a"), 1000);
        assert_eq!(cents(&split, "b"), 1500);
        assert_eq!(cents(&split, "c"), 500);
    }

    #[test]
    fn test_even_split_larger_than_order() {
        let split = apply_even_split(&lines(&[("a", 10), ("b", 20)]), Money::from_cents(5000));

        assert_eq!(cents(&split, "a"), 1000);
        assert_eq!(cents(&split, "b"), 2000);
    }

    #[test]
    fn test_even_split_rounds_half_up() {
        let split = apply_even_split(&lines(&[("a", 10), ("b", 10), ("c", 10)]), Money::from_cents(1000));

        for key in ["a", "b", "c"] {
            assert_eq!(cents(&split, key), 333);
        }
    }

    #[test]
    fn test_even_split_empty() {
        assert!(apply_even_split(&BTreeMap::new(), Money::from_cents(100)).is_empty());
    }

    #[test]
    fn test_percentage_self_corrects() {
        let input = lines(&[("a", 100), ("b", 37)]);

        let whole = apply_percentage(&input, Decimal::from(110));
        let fraction = apply_percentage(&input, Decimal::new(110, 2));
        assert_eq!(whole, fraction);
        assert_eq!(cents(&whole, "a"), 110);

        // 150 reads as 1.50, then 0.015: the same as passing 1.50.
        let big = apply_percentage(&input, Decimal::from(150));
        assert_eq!(big, apply_percentage(&input, Decimal::new(150, 2)));
        assert_eq!(cents(&big, "a"), 150);

        let ten = apply_percentage(&input, Decimal::from(10));
        assert_eq!(cents(&ten, "a"), 1000);
        assert_eq!(cents(&ten, "b"), 370);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        let input = lines(&[("a", 1)]);
        // 1.00 * 0.125 = 0.125 → 0.13
        let result = apply_percentage(&input, Decimal::new(125, 3));
        assert_eq!(cents(&result, "a"), 13);
    }

    #[test]
    fn test_disabled_wins_over_expired() {
        let d = Discount::new("OLD", "Old", date(2020, 1, 1), date(2020, 12, 31)).inactive();
        let check = d.is_valid(None, today(), &CurrencyFormat::default());
        assert!(!check.valid);
        assert_eq!(check.message, "This coupon is disabled.");
    }

    #[test]
    fn test_validity_dates_and_uses() {
        let fmt = CurrencyFormat::default();

        let future = Discount::new("SOON", "Soon", date(2025, 1, 1), date(2025, 12, 31));
        assert_eq!(future.is_valid(None, today(), &fmt).message, "This coupon is not active yet.");

        let expired = Discount::new("OLD", "Old", date(2020, 1, 1), date(2020, 12, 31));
        assert_eq!(expired.is_valid(None, today(), &fmt).message, "This coupon has expired.");

        let mut used = coupon("USED").with_allowed_uses(1);
        used.num_uses = 2;
        assert_eq!(
            used.is_valid(None, today(), &fmt).message,
            "This discount has exceeded the number of allowed uses."
        );

        // Reaching the cap is still allowed.
        used.num_uses = 1;
        assert!(used.is_valid(None, today(), &fmt).valid);

        let open = coupon("OPEN");
        assert_eq!(open.is_valid(None, today(), &fmt), DiscountCheck::pass());
    }

    #[test]
    fn test_validity_min_order() {
        let product = Product::new("TEE", "T-Shirt", Money::from_cents(1500));
        let cart = cart_with(&[&product]);
        let d = coupon("BIG").with_min_order(Money::from_cents(2500));

        let check = d.is_valid(Some(&cart), today(), &CurrencyFormat::default());
        assert!(!check.valid);
        assert_eq!(check.message, "This discount only applies to orders of at least $25.00.");

        let euro = d.is_valid(Some(&cart), today(), &CurrencyFormat::with_symbol("€"));
        assert_eq!(euro.message, "This discount only applies to orders of at least €25.00.");
    }

    #[test]
    fn test_validity_eligibility() {
        let fmt = CurrencyFormat::default();
        let tee = Product::new("TEE", "T-Shirt", Money::from_cents(1500));
        let mug = Product::new("MUG", "Mug", Money::from_cents(800));
        let gift = Product::new("GIFT", "Gift", Money::from_cents(2500))
            .with_kind(ProductKind::GiftCertificate);

        let mugs_only = coupon("MUGS").with_valid_products([mug.id.clone()]);
        let check = mugs_only.is_valid(Some(&cart_with(&[&tee])), today(), &fmt);
        assert_eq!(check.message, "This discount cannot be applied to the products in your cart.");
        assert!(mugs_only.is_valid(Some(&cart_with(&[&tee, &mug])), today(), &fmt).valid);

        let gift_mug = coupon("GIFTMUG").with_valid_products([gift.id.clone()]);
        assert!(!gift_mug.is_valid(Some(&cart_with(&[&gift])), today(), &fmt).valid);

        let anything = coupon("ALL");
        assert!(anything.is_valid(Some(&cart_with(&[&gift])), today(), &fmt).valid);
        assert!(anything.is_valid(Some(&cart_with(&[&gift, &tee])), today(), &fmt).valid);
    }

    #[test]
    fn test_free_shipping_valid_for_undiscountable_cart() {
        let mut plain = Product::new("BOOK", "Book", Money::from_cents(1200));
        plain.is_discountable = false;
        let cart = cart_with(&[&plain]);

        let ship = coupon("SHIP").with_free_shipping();
        let check = ship.is_valid(Some(&cart), today(), &CurrencyFormat::default());
        assert_eq!(check, DiscountCheck::pass());

        let mut order = Order::from_cart(&cart, Money::from_cents(700), Some("SHIP".into()));
        let mut ship = ship;
        ship.calc(&order);
        let splits = ship.item_discounts().unwrap();
        assert_eq!(splits[&DiscountKey::Shipping].cents(), 700);
        assert!(!splits.contains_key(&DiscountKey::Item(order.items[0].id.clone())));
        order.shipping_discount = splits[&DiscountKey::Shipping];
        assert_eq!(order.shipping_sub_total(), Money::zero());
    }

    #[test]
    fn test_total_before_calc_is_error() {
        let d = coupon("EARLY").with_amount(Money::from_cents(500));
        assert!(!d.is_calculated());
        assert!(matches!(d.total(), Err(CoreError::DiscountNotCalculated { .. })));
        assert!(d.item_discounts().is_err());
    }

    #[test]
    fn test_null_discount_is_calculated() {
        let null = find_discount_for_code(None, &[]);
        assert!(null.is_null());
        assert_eq!(null.total().unwrap(), Money::zero());
        assert!(null.item_discounts().unwrap().is_empty());

        let blank = find_discount_for_code(Some("  "), &[coupon("X")]);
        assert!(blank.is_null());
    }

    #[test]
    fn test_find_discount_for_code_skips_inactive() {
        let discounts = vec![coupon("SPRING"), coupon("OFF").inactive()];

        let found = find_discount_for_code(Some("SPRING"), &discounts);
        assert_eq!(found.code(), Some("SPRING"));

        assert!(find_discount_for_code(Some("OFF"), &discounts).is_null());
        assert!(find_discount_for_code(Some("NOPE"), &discounts).is_null());
    }

    #[test]
    fn test_validate_definition() {
        assert!(coupon("TEN").with_amount(Money::from_cents(1000)).validate().is_ok());

        let both = coupon("BOTH")
            .with_amount(Money::from_cents(1000))
            .with_percentage(Decimal::from(10));
        assert!(matches!(both.validate(), Err(ValidationError::MutuallyExclusive { .. })));

        assert!(coupon("NEG").with_amount(Money::from_cents(-1)).validate().is_err());
        assert!(coupon("HUGE").with_percentage(Decimal::from(150)).validate().is_err());
        assert!(coupon("bad code").validate().is_err());

        let backwards = Discount::new("BACK", "Backwards", date(2024, 2, 1), date(2024, 1, 1));
        assert!(backwards.validate().is_err());
    }

    #[test]
    fn test_record_use() {
        let mut d = coupon("ONCE").with_allowed_uses(0);
        d.record_use();
        assert_eq!(d.num_uses, 1);
        assert!(!d.is_valid(None, today(), &CurrencyFormat::default()).valid);
    }

    #[test]
    fn test_find_best_auto_discount() {
        let tee = Product::new("TEE", "T-Shirt", Money::from_cents(1500));
        let discounts = vec![
            coupon("AUTO5").automatic().with_percentage(Decimal::from(5)),
            coupon("AUTO20").automatic().with_percentage(Decimal::from(20)),
            coupon("MANUAL50").with_percentage(Decimal::from(50)),
            coupon("AUTO90").automatic().with_percentage(Decimal::from(90)).inactive(),
            coupon("FLAT").automatic().with_amount(Money::from_cents(500)),
        ];

        let best = find_best_auto_discount(&tee, &discounts, today()).unwrap();
        assert_eq!(best.code, "AUTO20");

        let gift = Product::new("GIFT", "Gift", Money::from_cents(2500))
            .with_kind(ProductKind::GiftCertificate);
        assert!(find_best_auto_discount(&gift, &discounts, today()).is_none());
    }
}
