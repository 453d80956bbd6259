//! # Configuration Module
//!
//! Typed, grouped, overridable settings with dependency gating.
//!
//! ## Structure
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ConfigurationSettings                                                  │
//! │  ├── ConfigurationGroup "TAX"       (ordering 10)                      │
//! │  │   ├── Setting MODULE   Module    default "tax.modules.no"           │
//! │  │   ├── Setting PERCENT  Decimal   requires MODULE = percent          │
//! │  │   └── Setting TAX_SHIPPING Bool  requires MODULE = percent          │
//! │  ├── overrides   { TAX.MODULE → "tax.modules.percent" }  (persisted)   │
//! │  ├── SettingCache                                   (memoized values)  │
//! │  └── changes     [Upsert/Delete]        (drained by the storage layer) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A setting is *active* when its group's gate and its own gate are open.
//! A gate names another setting and, optionally, a required value: scalar
//! settings must equal it, list settings must contain it. Without a
//! required value the other setting only needs to be truthy.
//!
//! ## Usage
//! ```rust
//! use satchmo_core::configuration::{
//!     register_default_settings, ConfigurationSettings, SettingValue,
//! };
//!
//! let mut config = ConfigurationSettings::new();
//! register_default_settings(&mut config).unwrap();
//!
//! assert!(config.update("TAX", "MODULE", "tax.modules.percent").unwrap());
//! assert_eq!(
//!     config.config_value("TAX", "MODULE").unwrap(),
//!     SettingValue::Module("tax.modules.percent".into())
//! );
//! ```

mod cache;
mod defaults;
mod group;
mod registry;
mod values;

pub use cache::{NotCached, SettingCache};
pub use defaults::{currency_format, register_default_settings};
pub use group::ConfigurationGroup;
pub use registry::{ConfigurationSettings, SettingChange};
pub use values::{Choice, DefaultValue, Setting, SettingKey, SettingKind, SettingValue};
