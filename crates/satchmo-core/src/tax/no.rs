//! Zero tax.

use std::collections::BTreeMap;

use super::{TaxBreakdown, TaxModule, TaxProcessor};
use crate::money::Money;
use crate::order::Order;

/// Charges nothing and reports no breakdown rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTax;

impl TaxProcessor for NoTax {
    fn key(&self) -> &'static str {
        TaxModule::No.key()
    }

    fn process(&self, _order: &Order) -> TaxBreakdown {
        (Money::zero(), BTreeMap::new())
    }

    fn by_price(&self, _tax_class: &str, _price: Money) -> Money {
        Money::zero()
    }
}
