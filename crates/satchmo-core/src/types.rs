//! # Domain Types
//!
//! Catalog and lifecycle types shared by the cart, discount and order modules.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────────┐   ┌────────────────┐   │
//! │  │    Product      │   │     ProductKind      │   │  OrderStatus   │   │
//! │  │  ─────────────  │   │  ──────────────────  │   │  ────────────  │   │
//! │  │  id (UUID)      │──►│  Simple              │   │  Temp          │   │
//! │  │  sku            │   │  Custom              │   │  New           │   │
//! │  │  price          │   │  Configurable        │   │  InProcess     │   │
//! │  │  is_discountable│   │  Subscription        │   │  Billed        │   │
//! │  │  taxable        │   │  Downloadable        │   │  Shipped       │   │
//! │  └─────────────────┘   │  GiftCertificate     │   │  Complete      │   │
//! │                        └──────────────────────┘   │  Cancelled     │   │
//! │                                                   └────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A product's specialised behaviour is a closed sum type: every question
//! that depends on the kind of product (can it ship? can it be discounted?)
//! is a `match` on [`ProductKind`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;
use crate::validation::{validate_price_cents, validate_sku, ValidationResult};

// =============================================================================
// Product Kind
// =============================================================================

/// The specialised variant of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProductKind {
    /// An ordinary physical product.
    #[default]
    Simple,

    /// Made to order. Deferred-shipping products are paid now and shipped
    /// separately, so they never add to the order's shipping.
    Custom {
        deferred_shipping: bool,
        /// Percentage of the price charged up front (0-100).
        downpayment_percent: u32,
    },

    /// A parent product whose variations are picked from option groups.
    Configurable { option_groups: Vec<String> },

    /// A recurring product billed every `recurring_days`.
    Subscription { recurring_days: u32 },

    /// A file delivered by download link.
    Downloadable { file_name: String },

    /// A stored-value certificate.
    GiftCertificate,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name.
    pub name: String,

    /// Unit price.
    pub price: Money,

    /// Specialised behaviour.
    pub kind: ProductKind,

    /// Store-level switch allowing discounts on this product.
    pub is_discountable: bool,

    /// Whether tax applies to this product.
    pub taxable: bool,

    /// Tax class name used by the tax processor (`None` = "Default").
    pub tax_class: Option<String>,

    /// Store-level switch for physical shipping.
    pub shippable: bool,

    /// Whether product is active (soft delete).
    pub active: bool,
}

impl Product {
    /// Creates an active, discountable, taxable, shippable simple product.
    pub fn new(sku: impl Into<String>, name: impl Into<String>, price: Money) -> Self {
        Product {
            id: Uuid::new_v4().to_string(),
            sku: sku.into(),
            name: name.into(),
            price,
            kind: ProductKind::Simple,
            is_discountable: true,
            taxable: true,
            tax_class: None,
            shippable: true,
            active: true,
        }
    }

    /// Sets the product kind (builder style).
    pub fn with_kind(mut self, kind: ProductKind) -> Self {
        self.kind = kind;
        self
    }

    /// Whether a discount may reduce this product's price.
    ///
    /// Gift certificates are stored value and are never discounted.
    pub fn is_discountable(&self) -> bool {
        match self.kind {
            ProductKind::GiftCertificate => false,
            _ => self.is_discountable,
        }
    }

    /// Whether the product needs physical shipping.
    pub fn is_shippable(&self) -> bool {
        match &self.kind {
            ProductKind::Simple | ProductKind::Configurable { .. } => self.shippable,
            ProductKind::Custom {
                deferred_shipping, ..
            } => self.shippable && !deferred_shipping,
            ProductKind::Subscription { .. }
            | ProductKind::Downloadable { .. }
            | ProductKind::GiftCertificate => false,
        }
    }

    /// Whether tax applies.
    pub fn is_taxable(&self) -> bool {
        match self.kind {
            ProductKind::GiftCertificate => false,
            _ => self.taxable,
        }
    }

    /// Tax class name, defaulting to `"Default"`.
    pub fn tax_class_name(&self) -> &str {
        self.tax_class.as_deref().unwrap_or(DEFAULT_TAX_CLASS)
    }

    /// Checks the SKU format and that the price is not negative.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_sku(&self.sku)?;
        validate_price_cents(self.price.cents())
    }
}

/// Tax class used when a product names none.
pub const DEFAULT_TAX_CLASS: &str = "Default";

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created during checkout, not yet confirmed.
    #[default]
    Temp,
    /// Confirmed by the shopper.
    New,
    /// Held for manual review.
    Blocked,
    /// Being fulfilled.
    InProcess,
    /// Payment captured.
    Billed,
    /// Handed to the carrier.
    Shipped,
    /// Finished.
    Complete,
    /// Cancelled before completion.
    Cancelled,
}

impl OrderStatus {
    /// Whether items and totals may still change.
    pub fn is_editable(&self) -> bool {
        matches!(self, OrderStatus::Temp | OrderStatus::New | OrderStatus::Blocked)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrderStatus::Temp => "temp",
            OrderStatus::New => "new",
            OrderStatus::Blocked => "blocked",
            OrderStatus::InProcess => "in_process",
            OrderStatus::Billed => "billed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Complete => "complete",
            OrderStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(kind: ProductKind) -> Product {
        Product::new("SKU-1", "Thing", Money::from_cents(1000)).with_kind(kind)
    }

    #[test]
    fn test_shippable_by_kind() {
        assert!(product(ProductKind::Simple).is_shippable());
        assert!(product(ProductKind::Configurable {
            option_groups: vec!["size".to_string()]
        })
        .is_shippable());
        assert!(!product(ProductKind::Downloadable {
            file_name: "song.mp3".to_string()
        })
        .is_shippable());
        assert!(!product(ProductKind::Subscription { recurring_days: 30 }).is_shippable());
        assert!(!product(ProductKind::Custom {
            deferred_shipping: true,
            downpayment_percent: 50
        })
        .is_shippable());
        assert!(product(ProductKind::Custom {
            deferred_shipping: false,
            downpayment_percent: 50
        })
        .is_shippable());
    }

    #[test]
    fn test_gift_certificate_rules() {
        let cert = product(ProductKind::GiftCertificate);
        assert!(!cert.is_discountable());
        assert!(!cert.is_taxable());
        assert!(!cert.is_shippable());
    }

    #[test]
    fn test_discountable_flag_respected() {
        let mut simple = product(ProductKind::Simple);
        assert!(simple.is_discountable());
        simple.is_discountable = false;
        assert!(!simple.is_discountable());
    }

    #[test]
    fn test_tax_class_default() {
        let mut simple = product(ProductKind::Simple);
        assert_eq!(simple.tax_class_name(), "Default");
        simple.tax_class = Some("Food".to_string());
        assert_eq!(simple.tax_class_name(), "Food");
    }

    #[test]
    fn test_order_status_default() {
        assert_eq!(OrderStatus::default(), OrderStatus::Temp);
        assert!(OrderStatus::New.is_editable());
        assert!(!OrderStatus::Shipped.is_editable());
        assert_eq!(OrderStatus::InProcess.to_string(), "in_process");
    }
}
