//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents for storage, Decimal for division         │
//! │    Line prices, shipping, tax, totals      → i64 cents                 │
//! │    $15.00 split across 7 lines             → Decimal, then rounded     │
//! │                                                                         │
//! │  Every value that leaves a calculation is rounded back to cents with   │
//! │  an explicit rounding rule (half-up for discounts, floor for tax).     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use satchmo_core::money::Money;
//!
//! let price = Money::from_cents(1099); // $10.99
//! let doubled = price * 2_i32;         // $21.98
//! let total = price + Money::from_cents(500); // $15.99
//! assert_eq!(total.cents(), 1599);
//! assert_eq!(doubled.to_string(), "$21.98");
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents for USD).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for refunds, discounts
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  OrderItem.unit_price ──► OrderItem.line_item_price ──► discount split │
/// │                                                             │           │
/// │  Order.shipping_cost ───────────────────────────────────────┤           │
/// │                                                             ▼           │
/// │  Order.sub_total ──► Tax processor ──► Order.tax ──► Order.total       │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use satchmo_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units (dollars and cents).
    ///
    /// For negative amounts, only the major unit should be negative:
    /// `from_major_minor(-5, 50)` = -$5.50, not -$4.50
    ///
    /// ```rust
    /// use satchmo_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies money by a quantity.
    ///
    /// ```rust
    /// use satchmo_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299); // $2.99
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns the value as a Decimal in major units (`1099` → `10.99`).
    ///
    /// Used when an amount has to be divided: the even-split allocator and
    /// the percentage discount work in Decimal and convert back at the end.
    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Converts a major-unit Decimal to Money, rounding half-up to the cent.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use satchmo_core::money::Money;
    ///
    /// // 10 / 3 = 3.3333... → $3.33
    /// let third = Decimal::from(10) / Decimal::from(3);
    /// assert_eq!(Money::from_decimal_half_up(third).cents(), 333);
    ///
    /// // 0.125 → $0.13 (half rounds away from zero)
    /// assert_eq!(Money::from_decimal_half_up(Decimal::new(125, 3)).cents(), 13);
    /// ```
    pub fn from_decimal_half_up(value: Decimal) -> Self {
        Self::from_rounded(value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Converts a major-unit Decimal to Money, always rounding down.
    ///
    /// Tax amounts use this rule: the shopper is never charged a fraction
    /// of a cent more than the rate produces.
    ///
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use satchmo_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal_floor(Decimal::new(8259, 4)).cents(), 82);
    /// ```
    pub fn from_decimal_floor(value: Decimal) -> Self {
        Self::from_rounded(value.round_dp_with_strategy(2, RoundingStrategy::ToNegativeInfinity))
    }

    fn from_rounded(rounded: Decimal) -> Self {
        // Already at two decimal places, so the product is integral.
        let cents = (rounded * Decimal::ONE_HUNDRED).trunc();
        Money(cents.to_i64().unwrap_or(i64::MAX))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money in a plain `$` format.
///
/// ## Note
/// This is for logs and debugging. Shopper-facing strings go through
/// [`CurrencyFormat`] so the configured symbol is used.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by integer (for quantity calculations).
impl Mul<i32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i32) -> Self {
        Money(self.0 * qty as i64)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Currency Formatting
// =============================================================================

/// Shopper-facing money formatting.
///
/// Built from the `SHOP.CURRENCY` setting; only used for messages such as
/// the minimum-order discount failure, never in arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyFormat {
    /// Currency symbol (for display)
    pub symbol: String,

    /// Number of decimal places for currency
    pub decimals: u8,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        CurrencyFormat {
            symbol: "$".to_string(),
            decimals: 2,
        }
    }
}

impl CurrencyFormat {
    /// Creates a format with the given symbol and two decimals.
    pub fn with_symbol(symbol: impl Into<String>) -> Self {
        CurrencyFormat {
            symbol: symbol.into(),
            decimals: 2,
        }
    }

    /// Formats a money amount.
    ///
    /// ## Example
    /// ```rust
    /// use satchmo_core::money::{CurrencyFormat, Money};
    ///
    /// let fmt = CurrencyFormat::with_symbol("€");
    /// assert_eq!(fmt.format(Money::from_cents(1234)), "€12.34");
    /// ```
    pub fn format(&self, amount: Money) -> String {
        let cents = amount.cents();
        let divisor = 10_i64.pow(self.decimals as u32);
        let whole = cents / divisor;
        let frac = (cents % divisor).abs();

        format!(
            "{}{}{}",
            if cents < 0 { "-" } else { "" },
            self.symbol,
            if self.decimals > 0 {
                format!(
                    "{}.{:0width$}",
                    whole.abs(),
                    frac,
                    width = self.decimals as usize
                )
            } else {
                whole.abs().to_string()
            }
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((-b).cents(), -500);
        let result: Money = a * 3;
        assert_eq!(result.cents(), 3000);
    }

    #[test]
    fn test_sum() {
        let values = vec![Money::from_cents(100), Money::from_cents(250)];
        let total: Money = values.iter().sum();
        assert_eq!(total.cents(), 350);
        let total: Money = values.into_iter().sum();
        assert_eq!(total.cents(), 350);
    }

    #[test]
    fn test_decimal_conversion() {
        assert_eq!(Money::from_cents(1099).to_decimal(), Decimal::new(1099, 2));
        assert_eq!(
            Money::from_decimal_half_up(Money::from_cents(1099).to_decimal()).cents(),
            1099
        );
    }

    #[test]
    fn test_half_up_vs_floor() {
        // 2.005 → half-up gives 2.01, floor gives 2.00
        let value = Decimal::new(2005, 3);
        assert_eq!(Money::from_decimal_half_up(value).cents(), 201);
        assert_eq!(Money::from_decimal_floor(value).cents(), 200);

        // 0.825 (8.25% of $10.00)
        let tax = Decimal::new(825, 3);
        assert_eq!(Money::from_decimal_half_up(tax).cents(), 83);
        assert_eq!(Money::from_decimal_floor(tax).cents(), 82);
    }

    #[test]
    fn test_format_currency() {
        let fmt = CurrencyFormat::default();
        assert_eq!(fmt.format(Money::from_cents(1234)), "$12.34");
        assert_eq!(fmt.format(Money::from_cents(1)), "$0.01");
        assert_eq!(fmt.format(Money::from_cents(-1234)), "-$12.34");

        let yen = CurrencyFormat {
            symbol: "¥".to_string(),
            decimals: 0,
        };
        assert_eq!(yen.format(Money::from_cents(500)), "¥500");
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());
        assert!(Money::from_cents(-100).is_negative());
    }
}
