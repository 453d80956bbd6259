//! Settings the checkout engine reads.

use rust_decimal::Decimal;

use super::group::ConfigurationGroup;
use super::registry::ConfigurationSettings;
use super::values::{Setting, SettingKind};
use crate::error::ConfigResult;
use crate::money::CurrencyFormat;
use crate::tax::TaxModule;

/// Registers the `SHOP`, `TAX` and `DISCOUNT` groups.
///
/// Safe to call more than once: re-registration replaces the definitions
/// and keeps persisted overrides.
pub fn register_default_settings(config: &mut ConfigurationSettings) -> ConfigResult<()> {
    config.config_register_group(ConfigurationGroup::new("SHOP", "Shop Settings").ordering(0));
    config.config_register_list([
        Setting::new("SHOP", "CURRENCY", SettingKind::String)
            .description("Currency symbol")
            .help_text("Symbol used when money is shown to shoppers.")
            .default_value("$")
            .ordering(1),
    ])?;

    config.config_register_group(ConfigurationGroup::new("TAX", "Tax Settings").ordering(10));
    config.config_register_list([
        Setting::new("TAX", "MODULE", SettingKind::Module)
            .description("Active tax module")
            .choices(TaxModule::ALL.map(|m| (m.key(), m.label())))
            .default_value(TaxModule::No.key())
            .ordering(1),
        Setting::new("TAX", "PERCENT", SettingKind::Decimal)
            .description("Percent tax")
            .help_text("Whole percentage, 8.25 means 8.25%.")
            .default_value(Decimal::ZERO)
            .requires_value("TAX", "MODULE", TaxModule::Percent.key())
            .ordering(2),
        Setting::new("TAX", "TAX_SHIPPING", SettingKind::Boolean)
            .description("Tax shipping?")
            .default_value(false)
            .requires_value("TAX", "MODULE", TaxModule::Percent.key())
            .ordering(3),
    ])?;

    config.config_register_group(
        ConfigurationGroup::new("DISCOUNT", "Discount Settings").ordering(20),
    );
    config.config_register_list([Setting::new(
        "DISCOUNT",
        "AUTOMATIC",
        SettingKind::Boolean,
    )
    .description("Apply automatic discounts")
    .help_text("Offer the best automatic discount on product pages and at checkout.")
    .default_value(true)])?;

    Ok(())
}

/// Shopper-facing money format from `SHOP.CURRENCY`.
pub fn currency_format(config: &ConfigurationSettings) -> CurrencyFormat {
    match config.config_string("SHOP", "CURRENCY") {
        Ok(symbol) => CurrencyFormat::with_symbol(symbol),
        Err(_) => CurrencyFormat::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_register() {
        let mut config = ConfigurationSettings::new();
        register_default_settings(&mut config).unwrap();

        assert_eq!(config.keys(), vec!["SHOP", "TAX", "DISCOUNT"]);
        assert_eq!(config.config_string("TAX", "MODULE").unwrap(), "tax.modules.no");
        assert_eq!(config.config_choice_values("TAX", "MODULE").unwrap().len(), 2);
        assert!(config.config_bool("DISCOUNT", "AUTOMATIC").unwrap());
        assert_eq!(currency_format(&config), CurrencyFormat::default());
    }

    #[test]
    fn test_percent_settings_follow_module() {
        let mut config = ConfigurationSettings::new();
        register_default_settings(&mut config).unwrap();

        let visible = |config: &ConfigurationSettings| config.group_settings("TAX").unwrap().len();
        assert_eq!(visible(&config), 1);

        config.update("TAX", "MODULE", "tax.modules.percent").unwrap();
        assert_eq!(visible(&config), 3);
    }

    #[test]
    fn test_registering_twice_keeps_overrides() {
        let mut config = ConfigurationSettings::new();
        register_default_settings(&mut config).unwrap();
        config.update("SHOP", "CURRENCY", "€").unwrap();

        register_default_settings(&mut config).unwrap();
        assert_eq!(currency_format(&config).symbol, "€");
    }
}
