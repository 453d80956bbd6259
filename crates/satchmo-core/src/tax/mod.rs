//! # Tax Processors
//!
//! Tax is computed by a processor chosen with the `TAX.MODULE` setting.
//!
//! ## Module Selection
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  TAX.MODULE = "tax.modules.no"      ──► NoTax                          │
//! │  TAX.MODULE = "tax.modules.percent" ──► PercentTax(TAX.PERCENT,        │
//! │                                                    TAX.TAX_SHIPPING)   │
//! │  anything else                      ──► ConfigError::UnknownModule     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Module keys resolve through [`TaxModule`], a closed table. Nothing is
//! loaded by name at runtime.
//!
//! ## Rounding
//! Tax amounts always round *down* to the cent, unlike discount splits
//! which round half-up.

mod no;
mod percent;

pub use no::NoTax;
pub use percent::PercentTax;

use std::collections::BTreeMap;

use tracing::debug;

use crate::configuration::ConfigurationSettings;
use crate::error::{ConfigError, ConfigResult};
use crate::money::Money;
use crate::order::Order;

/// Tax for a whole order: the total and a per-description breakdown.
pub type TaxBreakdown = (Money, BTreeMap<String, Money>);

/// Computes tax for orders and single prices.
pub trait TaxProcessor: Send + Sync {
    /// Stable module key, recorded on each `OrderTaxDetail`.
    fn key(&self) -> &'static str;

    /// Tax for the order's discounted lines (and shipping, if taxed).
    fn process(&self, order: &Order) -> TaxBreakdown;

    /// Tax on a single price in the given tax class.
    fn by_price(&self, tax_class: &str, price: Money) -> Money;
}

/// The tax modules this build knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxModule {
    No,
    Percent,
}

impl TaxModule {
    pub const ALL: [TaxModule; 2] = [TaxModule::No, TaxModule::Percent];

    pub fn key(&self) -> &'static str {
        match self {
            TaxModule::No => "tax.modules.no",
            TaxModule::Percent => "tax.modules.percent",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaxModule::No => "No tax",
            TaxModule::Percent => "Percent tax",
        }
    }

    /// Resolves a stored module key.
    pub fn from_key(setting: &str, key: &str) -> ConfigResult<Self> {
        TaxModule::ALL
            .into_iter()
            .find(|m| m.key() == key)
            .ok_or_else(|| ConfigError::UnknownModule {
                key: setting.to_string(),
                module: key.to_string(),
            })
    }
}

/// Builds the processor selected by `TAX.MODULE`.
pub fn processor_from_config(
    config: &ConfigurationSettings,
) -> ConfigResult<Box<dyn TaxProcessor>> {
    let key = config.config_string("TAX", "MODULE")?;
    let module = TaxModule::from_key("TAX.MODULE", &key)?;
    debug!(module = module.key(), "Selected tax processor");

    Ok(match module {
        TaxModule::No => Box::new(NoTax),
        TaxModule::Percent => Box::new(PercentTax::new(
            config.config_decimal("TAX", "PERCENT")?,
            config.config_bool("TAX", "TAX_SHIPPING")?,
        )),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::register_default_settings;

    #[test]
    fn test_from_key() {
        assert_eq!(
            TaxModule::from_key("TAX.MODULE", "tax.modules.percent").unwrap(),
            TaxModule::Percent
        );
        assert!(matches!(
            TaxModule::from_key("TAX.MODULE", "tax.modules.area"),
            Err(ConfigError::UnknownModule { .. })
        ));
    }

    #[test]
    fn test_processor_follows_setting() {
        let mut config = ConfigurationSettings::new();
        register_default_settings(&mut config).unwrap();

        let processor = processor_from_config(&config).unwrap();
        assert_eq!(processor.key(), "tax.modules.no");

        config.update("TAX", "MODULE", "tax.modules.percent").unwrap();
        config.update("TAX", "PERCENT", "10").unwrap();

        let processor = processor_from_config(&config).unwrap();
        assert_eq!(processor.key(), "tax.modules.percent");
        assert_eq!(
            processor.by_price("Default", Money::from_cents(1999)).cents(),
            199
        );
    }

    #[test]
    fn test_unknown_module_in_storage() {
        let mut config = ConfigurationSettings::new();
        register_default_settings(&mut config).unwrap();
        config.load_persisted(
            crate::configuration::SettingKey::new("TAX", "MODULE"),
            "tax.modules.area".to_string(),
        );

        assert!(matches!(
            processor_from_config(&config),
            Err(ConfigError::UnknownModule { .. })
        ));
    }
}
