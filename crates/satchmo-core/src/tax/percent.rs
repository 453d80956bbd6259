//! Flat percentage tax.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::debug;

use super::{TaxBreakdown, TaxModule, TaxProcessor};
use crate::money::Money;
use crate::order::Order;

/// One rate for every taxable line, optionally applied to shipping too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PercentTax {
    /// Whole percentage, `8.25` = 8.25%.
    percent: Decimal,
    tax_shipping: bool,
}

impl PercentTax {
    pub fn new(percent: Decimal, tax_shipping: bool) -> Self {
        PercentTax {
            percent,
            tax_shipping,
        }
    }

    fn rate(&self) -> Decimal {
        self.percent / Decimal::ONE_HUNDRED
    }

    fn apply(&self, amount: Money) -> Money {
        Money::from_decimal_floor(amount.to_decimal() * self.rate())
    }
}

impl TaxProcessor for PercentTax {
    fn key(&self) -> &'static str {
        TaxModule::Percent.key()
    }

    /// Taxes the discounted sub_total of taxable lines. The breakdown has
    /// one row named after the rate (`8.25%`) and, when shipping is taxed,
    /// a `Shipping` row.
    fn process(&self, order: &Order) -> TaxBreakdown {
        let mut taxable: Money = order
            .items
            .iter()
            .filter(|item| item.product.is_taxable())
            .map(|item| item.sub_total())
            .sum();

        let mut breakdown = BTreeMap::new();
        breakdown.insert(format!("{}%", self.percent.normalize()), self.apply(taxable));

        if self.tax_shipping {
            let shipping = order.shipping_sub_total();
            breakdown.insert("Shipping".to_string(), self.apply(shipping));
            taxable += shipping;
        }

        let tax = self.apply(taxable);
        debug!(order_id = %order.id, %taxable, %tax, "Percent tax computed");
        (tax, breakdown)
    }

    fn by_price(&self, _tax_class: &str, price: Money) -> Money {
        self.apply(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Product, ProductKind};

    #[test]
    fn test_floors_to_cent() {
        let tax = PercentTax::new(Decimal::new(825, 2), false);
        // 19.99 * 0.0825 = 1.649175
        assert_eq!(tax.by_price("Default", Money::from_cents(1999)).cents(), 164);
    }

    #[test]
    fn test_skips_untaxable_lines() {
        let mut order = Order::new(Money::from_cents(500), None);
        order.add_item(&Product::new("TEE", "T-Shirt", Money::from_cents(2000)), 1);
        order.add_item(
            &Product::new("GIFT", "Gift", Money::from_cents(5000))
                .with_kind(ProductKind::GiftCertificate),
            1,
        );

        let (tax, breakdown) = PercentTax::new(Decimal::from(10), false).process(&order);
        assert_eq!(tax.cents(), 200);
        assert_eq!(breakdown["10%"].cents(), 200);
        assert!(!breakdown.contains_key("Shipping"));
    }

    #[test]
    fn test_taxes_shipping_when_enabled() {
        let mut order = Order::new(Money::from_cents(500), None);
        order.add_item(&Product::new("TEE", "T-Shirt", Money::from_cents(2000)), 1);

        let (tax, breakdown) = PercentTax::new(Decimal::from(10), true).process(&order);
        assert_eq!(tax.cents(), 250);
        assert_eq!(breakdown["Shipping"].cents(), 50);
    }
}
