//! # satchmo-core: Pure Checkout Logic for Satchmo
//!
//! Settings resolution, discount allocation and order totals, with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Satchmo Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Storefront / admin (callers)                    │   │
//! │  │    Cart page ──► Apply coupon ──► Checkout ──► Payment         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ satchmo-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │  ┌──────────────┐ ┌──────────┐ ┌─────────┐ ┌───────┐ ┌──────┐  │   │
//! │  │  │configuration │ │ discount │ │  order  │ │  tax  │ │ cart │  │   │
//! │  │  │  Settings    │ │ calc     │ │ totals  │ │ no    │ │      │  │   │
//! │  │  │  gating      │ │ split    │ │ payments│ │percent│ │      │  │   │
//! │  │  └──────────────┘ └──────────┘ └─────────┘ └───────┘ └──────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  satchmo-db (Database Layer)                    │   │
//! │  │     SQLite pool, migrations, repositories, OrderService         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`configuration`] - Settings registry with dependency gating
//! - [`discount`] - Coupons, validity checks, even-split and percentage allocation
//! - [`order`] - Orders, payments and total recalculation
//! - [`tax`] - Tax processors selected by `TAX.MODULE`
//! - [`cart`] - Shopping cart
//! - [`types`] - Products and order status
//! - [`money`] - Money type with integer arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use satchmo_core::discount::{find_discount_for_code, Discount};
//! use satchmo_core::order::Order;
//! use satchmo_core::tax::NoTax;
//! use satchmo_core::{Money, Product};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
//! let coupons = vec![Discount::new("SIX", "$6 off", start, end).with_amount(Money::from_cents(600))];
//!
//! let mut order = Order::new(Money::from_cents(500), Some("SIX".into()));
//! order.add_item(&Product::new("A", "Ten", Money::from_cents(1000)), 1);
//! order.add_item(&Product::new("B", "Twenty", Money::from_cents(2000)), 1);
//!
//! let mut discount = find_discount_for_code(order.discount_code.as_deref(), &coupons);
//! order.force_recalculate_total(&mut discount, &NoTax).unwrap();
//!
//! assert_eq!(order.discount.cents(), 600);
//! assert_eq!(order.total.cents(), 2900);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod configuration;
pub mod discount;
pub mod error;
pub mod money;
pub mod order;
pub mod tax;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{ConfigError, CoreError, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;
