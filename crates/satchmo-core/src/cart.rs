//! # Cart
//!
//! The shopper's cart before checkout turns it into an [`Order`].
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Add product ──────────► add_item() ──────► items.push / qty += n      │
//! │  Change quantity ──────► update_quantity() ► items[i].qty = n          │
//! │  Remove ───────────────► remove_item() ────► items.retain(..)          │
//! │  Apply coupon ─────────► Discount::is_valid(Some(&cart), today)        │
//! │  Checkout ─────────────► Order::from_cart(&cart, shipping, code)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`Order`]: crate::order::Order

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Product;
use crate::validation::validate_quantity;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// An item in the shopping cart.
///
/// The product is a snapshot taken when the item was added, so the
/// price shown in the cart doesn't move if the catalog changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    /// Product at time of adding (frozen)
    pub product: Product,

    /// Quantity in cart
    pub quantity: i64,

    /// When this item was added to cart
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Creates a new cart item from a product and quantity.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartItem {
            product: product.clone(),
            quantity,
            added_at: Utc::now(),
        }
    }

    /// Unit price frozen at the time of adding.
    pub fn unit_price(&self) -> Money {
        self.product.price
    }

    /// Calculates the line total (unit price × quantity).
    pub fn line_total(&self) -> Money {
        self.product.price.multiply_quantity(self.quantity)
    }
}

/// The shopping cart.
///
/// ## Invariants
/// - Items are unique by product id (adding the same product increases quantity)
/// - Quantity is always > 0 (updating to 0 removes the item)
/// - At most `MAX_CART_ITEMS` lines and `MAX_ITEM_QUANTITY` per line
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Cart {
    /// Items in the cart
    pub items: Vec<CartItem>,

    /// When the cart was created/last cleared
    pub created_at: DateTime<Utc>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart {
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds a product to the cart or increases quantity if already present.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;

        if let Some(item) = self.items.iter_mut().find(|i| i.product.id == product.id) {
            let new_qty = item.quantity + quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            item.quantity = new_qty;
            return Ok(());
        }

        product.validate()?;
        if self.items.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        self.items.push(CartItem::from_product(product, quantity));
        Ok(())
    }

    /// Updates the quantity of an item; a quantity of 0 removes it.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_item(product_id);
        }
        validate_quantity(quantity)?;

        match self.items.iter_mut().find(|i| i.product.id == product_id) {
            Some(item) => {
                item.quantity = quantity;
                Ok(())
            }
            None => Err(CoreError::ItemNotInCart(product_id.to_string())),
        }
    }

    /// Removes an item from the cart by product ID.
    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<()> {
        let initial_len = self.items.len();
        self.items.retain(|i| i.product.id != product_id);

        if self.items.len() == initial_len {
            Err(CoreError::ItemNotInCart(product_id.to_string()))
        } else {
            Ok(())
        }
    }

    /// Clears all items from the cart.
    pub fn clear(&mut self) {
        self.items.clear();
        self.created_at = Utc::now();
    }

    /// Returns the number of unique items in the cart.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the total quantity of all items.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Undiscounted sum of all line totals.
    pub fn total(&self) -> Money {
        self.items.iter().map(|i| i.line_total()).sum()
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether anything in the cart needs shipping.
    pub fn is_shippable(&self) -> bool {
        self.items.iter().any(|i| i.product.is_shippable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProductKind;

    fn test_product(sku: &str, price_cents: i64) -> Product {
        Product::new(sku, format!("Product {}", sku), Money::from_cents(price_cents))
    }

    #[test]
    fn test_cart_add_item() {
        let mut cart = Cart::new();
        let product = test_product("A", 999);

        cart.add_item(&product, 2).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 2);
        assert_eq!(cart.total().cents(), 1998);
    }

    #[test]
    fn test_cart_rejects_invalid_product() {
        let mut cart = Cart::new();

        assert!(matches!(
            cart.add_item(&test_product("has space", 100), 1),
            Err(CoreError::Validation(_))
        ));
        assert!(cart.add_item(&test_product("NEG", -1), 1).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_cart_add_same_product_increases_quantity() {
        let mut cart = Cart::new();
        let product = test_product("A", 999);

        cart.add_item(&product, 2).unwrap();
        cart.add_item(&product, 3).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_cart_quantity_limit() {
        let mut cart = Cart::new();
        let product = test_product("A", 100);

        cart.add_item(&product, MAX_ITEM_QUANTITY).unwrap();
        let err = cart.add_item(&product, 1).unwrap_err();
        assert!(matches!(err, CoreError::QuantityTooLarge { .. }));
    }

    #[test]
    fn test_cart_update_and_remove() {
        let mut cart = Cart::new();
        let a = test_product("A", 100);
        let b = test_product("B", 200);
        cart.add_item(&a, 1).unwrap();
        cart.add_item(&b, 1).unwrap();

        cart.update_quantity(&a.id, 4).unwrap();
        assert_eq!(cart.total().cents(), 600);

        cart.update_quantity(&b.id, 0).unwrap();
        assert_eq!(cart.item_count(), 1);

        assert!(matches!(
            cart.remove_item("missing"),
            Err(CoreError::ItemNotInCart(_))
        ));
    }

    #[test]
    fn test_cart_clear() {
        let mut cart = Cart::new();
        cart.add_item(&test_product("A", 999), 2).unwrap();
        assert!(!cart.is_empty());

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Money::zero());
    }

    #[test]
    fn test_cart_shippable() {
        let mut cart = Cart::new();
        let download = test_product("DL", 500).with_kind(ProductKind::Downloadable {
            file_name: "book.pdf".to_string(),
        });
        cart.add_item(&download, 1).unwrap();
        assert!(!cart.is_shippable());

        cart.add_item(&test_product("BOX", 500), 1).unwrap();
        assert!(cart.is_shippable());
    }
}
