//! The settings registry.
//!
//! ## Lookup Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  config_value("TAX", "PERCENT")                                        │
//! │       │                                                                 │
//! │       ├── cache hit? ───────────────────────────────► value            │
//! │       │                                                                 │
//! │       ▼ (NotCached)                                                     │
//! │  persisted override? ──► parse through SettingKind ──┐                 │
//! │       │                                              │                 │
//! │       ▼ (none)                                       ▼                 │
//! │  resolve default (static or lazy) ────────────► cache_set ──► value    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Write Flow
//! `update()` compares against the effective value, then either deletes
//! the override (value == default) or upserts it. Each persisted change is
//! journalled as a [`SettingChange`]; the storage layer drains the journal
//! and writes it through, the same way an outbox is drained.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::cache::SettingCache;
use super::group::ConfigurationGroup;
use super::values::{Choice, Setting, SettingKey, SettingValue};
use crate::error::{ConfigError, ConfigResult};

/// A persisted-override change waiting to be written to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SettingChange {
    Upsert { key: SettingKey, value: String },
    Delete { key: SettingKey },
}

impl SettingChange {
    pub fn key(&self) -> &SettingKey {
        match self {
            SettingChange::Upsert { key, .. } | SettingChange::Delete { key } => key,
        }
    }
}

/// Registry of every configuration group and setting.
///
/// Built once at startup and passed by reference to whatever needs
/// settings. Tests call [`reset_for_testing`](Self::reset_for_testing)
/// between cases instead of rebuilding it.
#[derive(Debug, Default)]
pub struct ConfigurationSettings {
    groups: HashMap<String, ConfigurationGroup>,
    settings: HashMap<SettingKey, Setting>,
    /// Choices added before their setting was registered.
    pending_choices: HashMap<SettingKey, Vec<Choice>>,
    /// Persisted overrides in storage format.
    overrides: HashMap<SettingKey, String>,
    changes: Vec<SettingChange>,
    cache: SettingCache,
    next_seq: u64,
}

impl ConfigurationSettings {
    pub fn new() -> Self {
        ConfigurationSettings::default()
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers (or re-describes) a group.
    pub fn config_register_group(&mut self, mut group: ConfigurationGroup) {
        group.seq = match self.groups.get(&group.key) {
            Some(existing) => existing.seq,
            None => self.bump_seq(),
        };
        debug!(group = %group.key, ordering = group.ordering, "Registering configuration group");
        self.groups.insert(group.key.clone(), group);
    }

    /// Registers a setting.
    ///
    /// The setting's group is created on the fly if it isn't registered
    /// yet. Choices buffered by [`config_add_choice`](Self::config_add_choice)
    /// are merged in. Registering the same `(group, key)` twice replaces the
    /// earlier definition (last registration wins).
    pub fn config_register(&mut self, mut setting: Setting) -> ConfigResult<()> {
        let key = setting.setting_key();

        // Reject defaults that don't fit the declared kind up front.
        setting.default_value_resolved()?;

        if !self.groups.contains_key(&setting.group) {
            self.config_register_group(ConfigurationGroup::new(
                setting.group.clone(),
                setting.group.clone(),
            ));
        }

        match self.settings.remove(&key) {
            Some(previous) => {
                warn!(setting = %key, "Setting registered twice; replacing earlier definition");
                setting.seq = previous.seq;
                if setting.choices.is_empty() {
                    setting.choices = previous.choices;
                }
            }
            None => setting.seq = self.bump_seq(),
        }

        if let Some(buffered) = self.pending_choices.remove(&key) {
            debug!(setting = %key, count = buffered.len(), "Merging preregistered choices");
            setting.choices.extend(buffered);
        }

        self.cache.delete(&key);
        self.settings.insert(key, setting);
        Ok(())
    }

    /// Registers several settings at once.
    pub fn config_register_list<I>(&mut self, settings: I) -> ConfigResult<()>
    where
        I: IntoIterator<Item = Setting>,
    {
        for setting in settings {
            self.config_register(setting)?;
        }
        Ok(())
    }

    /// Appends a choice to a setting, even one not registered yet.
    pub fn config_add_choice(&mut self, group: &str, key: &str, choice: impl Into<Choice>) {
        let skey = SettingKey::new(group, key);
        let choice = choice.into();
        match self.settings.get_mut(&skey) {
            Some(setting) => setting.choices.push(choice),
            None => {
                debug!(setting = %skey, value = %choice.value, "Buffering choice for unregistered setting");
                self.pending_choices.entry(skey).or_default().push(choice);
            }
        }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Looks up a setting definition.
    pub fn find_setting(&self, group: &str, key: &str) -> Option<&Setting> {
        self.settings.get(&SettingKey::new(group, key))
    }

    /// Looks up a setting definition, failing with `SettingNotSet`.
    pub fn config_get(&self, group: &str, key: &str) -> ConfigResult<&Setting> {
        self.find_setting(group, key)
            .ok_or_else(|| ConfigError::not_set(group, key))
    }

    pub fn config_exists(&self, group: &str, key: &str) -> bool {
        self.find_setting(group, key).is_some()
    }

    pub fn config_get_group(&self, group: &str) -> ConfigResult<&ConfigurationGroup> {
        self.groups
            .get(group)
            .ok_or_else(|| ConfigError::GroupNotFound(group.to_string()))
    }

    /// Current value: the persisted override if there is one, else the default.
    pub fn config_value(&self, group: &str, key: &str) -> ConfigResult<SettingValue> {
        let setting = self.config_get(group, key)?;
        let skey = setting.setting_key();

        if let Ok(value) = self.cache.get(&skey) {
            return Ok(value);
        }

        let value = match self.overrides.get(&skey) {
            Some(raw) => setting.kind.parse(&skey, raw)?,
            None => setting.default_value_resolved()?,
        };
        self.cache.set(skey, value.clone());
        Ok(value)
    }

    /// Like [`config_value`](Self::config_value) but never fails.
    pub fn config_value_safe(
        &self,
        group: &str,
        key: &str,
        fallback: impl Into<SettingValue>,
    ) -> SettingValue {
        match self.config_value(group, key) {
            Ok(value) => value,
            Err(e) => {
                debug!(group, key, error = %e, "Falling back to default for setting");
                fallback.into()
            }
        }
    }

    pub fn config_bool(&self, group: &str, key: &str) -> ConfigResult<bool> {
        let value = self.config_value(group, key)?;
        value
            .as_bool()
            .ok_or_else(|| ConfigError::invalid(format!("{}.{}", group, key), "not a boolean"))
    }

    pub fn config_decimal(&self, group: &str, key: &str) -> ConfigResult<rust_decimal::Decimal> {
        let value = self.config_value(group, key)?;
        value
            .as_decimal()
            .ok_or_else(|| ConfigError::invalid(format!("{}.{}", group, key), "not a decimal"))
    }

    pub fn config_string(&self, group: &str, key: &str) -> ConfigResult<String> {
        let value = self.config_value(group, key)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ConfigError::invalid(format!("{}.{}", group, key), "not a string"))
    }

    /// The `(value, label)` choices of a setting.
    pub fn config_choice_values(&self, group: &str, key: &str) -> ConfigResult<&[Choice]> {
        Ok(&self.config_get(group, key)?.choices)
    }

    // =========================================================================
    // Gating and Iteration
    // =========================================================================

    fn gate_open(&self, requires: Option<&SettingKey>, required: Option<&SettingValue>) -> bool {
        let Some(req) = requires else {
            return true;
        };
        match self.config_value(&req.group, &req.key) {
            Ok(value) => value.satisfies(required),
            Err(e) => {
                debug!(requires = %req, error = %e, "Gate refers to an unusable setting");
                false
            }
        }
    }

    /// Whether a group's own gate is open.
    pub fn group_is_active(&self, group: &str) -> bool {
        match self.groups.get(group) {
            Some(g) => self.gate_open(g.requires.as_ref(), g.requires_value.as_ref()),
            None => false,
        }
    }

    /// Whether a setting is active: its group is active and its own gate is open.
    pub fn is_active(&self, setting: &Setting) -> bool {
        self.group_is_active(&setting.group)
            && self.gate_open(setting.requires.as_ref(), setting.requires_value.as_ref())
    }

    /// Active settings of a group, `ordering` ascending, ties by registration.
    pub fn group_settings(&self, group: &str) -> ConfigResult<Vec<&Setting>> {
        self.config_get_group(group)?;
        if !self.group_is_active(group) {
            return Ok(Vec::new());
        }

        let mut settings: Vec<&Setting> = self
            .settings
            .values()
            .filter(|s| s.group == group)
            .filter(|s| self.is_active(s))
            .collect();
        settings.sort_by_key(|s| (s.ordering, s.seq));
        Ok(settings)
    }

    /// Every group, lowest `ordering` first, ties by registration.
    ///
    /// Groups registered with orderings -1001, -1002, -1003 come out as
    /// -1003, -1002, -1001.
    pub fn groups(&self) -> Vec<&ConfigurationGroup> {
        let mut groups: Vec<&ConfigurationGroup> = self.groups.values().collect();
        groups.sort_by_key(|g| (g.ordering, g.seq));
        groups
    }

    /// Group keys in iteration order.
    pub fn keys(&self) -> Vec<&str> {
        self.groups().into_iter().map(|g| g.key.as_str()).collect()
    }

    // =========================================================================
    // Updates and Storage
    // =========================================================================

    /// Sets a setting's value.
    ///
    /// ## Returns
    /// * `Ok(false)` - value equals the current effective value, nothing changed
    /// * `Ok(true)` - value changed; the override was deleted (value equals
    ///   the default) or upserted
    pub fn update(
        &mut self,
        group: &str,
        key: &str,
        value: impl Into<SettingValue>,
    ) -> ConfigResult<bool> {
        let setting = self.config_get(group, key)?;
        let skey = setting.setting_key();
        let value = setting.kind.coerce(&skey, value.into())?;
        let default = setting.default_value_resolved()?;

        let current = self.config_value(group, key)?;
        if current == value {
            debug!(setting = %skey, "Update is a no-op");
            return Ok(false);
        }

        if value == default {
            self.overrides.remove(&skey);
            self.changes.push(SettingChange::Delete { key: skey.clone() });
            info!(setting = %skey, "Setting reset to default");
        } else {
            let raw = value.to_storage();
            self.overrides.insert(skey.clone(), raw.clone());
            self.changes.push(SettingChange::Upsert {
                key: skey.clone(),
                value: raw,
            });
            info!(setting = %skey, value = %value, "Setting updated");
        }

        self.cache.delete(&skey);
        Ok(true)
    }

    /// Loads a persisted override read from storage.
    ///
    /// Overrides for settings that aren't registered are kept, so they take
    /// effect if the setting is registered later.
    pub fn load_persisted(&mut self, key: SettingKey, raw: String) {
        self.cache.delete(&key);
        self.overrides.insert(key, raw);
    }

    /// Whether a persisted override exists for the setting.
    pub fn has_override(&self, group: &str, key: &str) -> bool {
        self.overrides.contains_key(&SettingKey::new(group, key))
    }

    /// Takes the journal of changes not yet written to storage.
    pub fn drain_changes(&mut self) -> Vec<SettingChange> {
        std::mem::take(&mut self.changes)
    }

    /// Puts changes back at the front of the journal after a failed write.
    pub fn requeue_changes(&mut self, mut changes: Vec<SettingChange>) {
        changes.append(&mut self.changes);
        self.changes = changes;
    }

    /// Drops the cache.
    pub fn cache_delete(&self) {
        self.cache.clear();
    }

    /// Forgets every override, journalled change and cached value.
    /// Registrations are kept.
    pub fn reset_for_testing(&mut self) {
        self.overrides.clear();
        self.changes.clear();
        self.cache.clear();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::values::SettingKind;
    use rust_decimal::Decimal;

    fn registry_with_basic() -> ConfigurationSettings {
        let mut cfg = ConfigurationSettings::new();
        cfg.config_register_group(ConfigurationGroup::new("BASIC", "Basic"));
        cfg.config_register(
            Setting::new("BASIC", "ONE", SettingKind::String).default_value("a string value"),
        )
        .unwrap();
        cfg
    }

    #[test]
    fn test_value_defaults_then_persists() {
        let mut cfg = registry_with_basic();

        assert_eq!(
            cfg.config_value("BASIC", "ONE").unwrap(),
            SettingValue::from("a string value")
        );

        assert!(cfg.update("BASIC", "ONE", "a new value").unwrap());
        assert_eq!(
            cfg.config_value("BASIC", "ONE").unwrap(),
            SettingValue::from("a new value")
        );
        assert!(cfg.has_override("BASIC", "ONE"));
    }

    #[test]
    fn test_update_returns_false_for_current_value() {
        let mut cfg = registry_with_basic();

        // First call with the default: nothing to do.
        assert!(!cfg.update("BASIC", "ONE", "a string value").unwrap());
        assert!(cfg.drain_changes().is_empty());

        assert!(cfg.update("BASIC", "ONE", "other").unwrap());
        assert!(!cfg.update("BASIC", "ONE", "other").unwrap());
    }

    #[test]
    fn test_requeued_changes_keep_their_order() {
        let mut cfg = registry_with_basic();

        cfg.update("BASIC", "ONE", "first").unwrap();
        let failed = cfg.drain_changes();
        cfg.update("BASIC", "ONE", "a string value").unwrap();
        cfg.requeue_changes(failed);

        let changes = cfg.drain_changes();
        assert_eq!(changes.len(), 2);
        assert!(matches!(&changes[0], SettingChange::Upsert { value, .. } if value == "first"));
        assert!(matches!(&changes[1], SettingChange::Delete { .. }));
    }

    #[test]
    fn test_update_to_default_deletes_override() {
        let mut cfg = registry_with_basic();

        assert!(cfg.update("BASIC", "ONE", "other").unwrap());
        assert!(cfg.update("BASIC", "ONE", "a string value").unwrap());
        assert!(!cfg.has_override("BASIC", "ONE"));
        assert_eq!(
            cfg.config_value("BASIC", "ONE").unwrap(),
            SettingValue::from("a string value")
        );

        let changes = cfg.drain_changes();
        assert_eq!(changes.len(), 2);
        assert!(matches!(changes[0], SettingChange::Upsert { .. }));
        assert!(matches!(changes[1], SettingChange::Delete { .. }));
        assert!(cfg.drain_changes().is_empty());
    }

    #[test]
    fn test_setting_not_set() {
        let cfg = registry_with_basic();
        let err = cfg.config_get("BASIC", "MISSING").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::SettingNotSet { ref key } if key == "BASIC.MISSING"
        ));
        assert!(cfg.find_setting("BASIC", "MISSING").is_none());
        assert!(!cfg.config_exists("NOPE", "ONE"));
    }

    #[test]
    fn test_value_safe_falls_back() {
        let cfg = registry_with_basic();
        assert_eq!(
            cfg.config_value_safe("BASIC", "MISSING", "fallback"),
            SettingValue::from("fallback")
        );
    }

    #[test]
    fn test_update_rejects_wrong_type() {
        let mut cfg = ConfigurationSettings::new();
        cfg.config_register(
            Setting::new("SHOP", "COUNT", SettingKind::PositiveInteger).default_value(1i64),
        )
        .unwrap();

        assert!(matches!(
            cfg.update("SHOP", "COUNT", "many"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(cfg.update("SHOP", "COUNT", -5i64).is_err());
        assert!(cfg.update("SHOP", "COUNT", "7").unwrap());
        assert_eq!(cfg.config_value("SHOP", "COUNT").unwrap(), SettingValue::Integer(7));
    }

    #[test]
    fn test_register_rejects_bad_default() {
        let mut cfg = ConfigurationSettings::new();
        let result = cfg.config_register(
            Setting::new("SHOP", "RATE", SettingKind::Decimal).default_value("not a number"),
        );
        assert!(result.is_err());
        assert!(!cfg.config_exists("SHOP", "RATE"));
    }

    #[test]
    fn test_corrupt_override_is_reported() {
        let mut cfg = ConfigurationSettings::new();
        cfg.config_register(
            Setting::new("TAX", "PERCENT", SettingKind::Decimal).default_value(Decimal::ZERO),
        )
        .unwrap();
        cfg.load_persisted(SettingKey::new("TAX", "PERCENT"), "eight".to_string());

        assert!(cfg.config_value("TAX", "PERCENT").is_err());
        assert_eq!(
            cfg.config_value_safe("TAX", "PERCENT", Decimal::ONE),
            SettingValue::Decimal(Decimal::ONE)
        );
    }

    #[test]
    fn test_group_ordering() {
        let mut cfg = ConfigurationSettings::new();
        cfg.config_register_group(ConfigurationGroup::new("group1", "Group 1").ordering(-1001));
        cfg.config_register_group(ConfigurationGroup::new("group2", "Group 2").ordering(-1002));
        cfg.config_register_group(ConfigurationGroup::new("group3", "Group 3").ordering(-1003));

        assert_eq!(cfg.keys(), vec!["group3", "group2", "group1"]);
    }

    #[test]
    fn test_setting_ordering_within_group() {
        let mut cfg = ConfigurationSettings::new();
        cfg.config_register_group(ConfigurationGroup::new("G", "G"));
        cfg.config_register(Setting::new("G", "C", SettingKind::Boolean).ordering(3))
            .unwrap();
        cfg.config_register(Setting::new("G", "A", SettingKind::Boolean).ordering(1))
            .unwrap();
        cfg.config_register(Setting::new("G", "B1", SettingKind::Boolean).ordering(2))
            .unwrap();
        cfg.config_register(Setting::new("G", "B2", SettingKind::Boolean).ordering(2))
            .unwrap();

        let keys: Vec<&str> = cfg
            .group_settings("G")
            .unwrap()
            .into_iter()
            .map(|s| s.key.as_str())
            .collect();
        assert_eq!(keys, vec!["A", "B1", "B2", "C"]);
    }

    #[test]
    fn test_requires_scalar_gate() {
        let mut cfg = ConfigurationSettings::new();
        cfg.config_register(
            Setting::new("req", "bool1", SettingKind::Boolean).default_value(false),
        )
        .unwrap();
        cfg.config_register(
            Setting::new("req", "bool2", SettingKind::Boolean)
                .default_value(false)
                .requires("req", "bool1"),
        )
        .unwrap();

        let keys = |cfg: &ConfigurationSettings| -> Vec<String> {
            cfg.group_settings("req")
                .unwrap()
                .into_iter()
                .map(|s| s.key.clone())
                .collect()
        };

        assert_eq!(keys(&cfg), vec!["bool1"]);
        cfg.update("req", "bool1", true).unwrap();
        assert_eq!(keys(&cfg), vec!["bool1", "bool2"]);
    }

    #[test]
    fn test_requires_value_gate() {
        let mut cfg = ConfigurationSettings::new();
        cfg.config_register(
            Setting::new("TAX", "MODULE", SettingKind::Module).default_value("tax.modules.no"),
        )
        .unwrap();
        cfg.config_register(
            Setting::new("TAX", "PERCENT", SettingKind::Decimal)
                .requires_value("TAX", "MODULE", "tax.modules.percent"),
        )
        .unwrap();

        let percent = cfg.config_get("TAX", "PERCENT").unwrap().clone();
        assert!(!cfg.is_active(&percent));

        cfg.update("TAX", "MODULE", "tax.modules.percent").unwrap();
        assert!(cfg.is_active(&percent));
    }

    #[test]
    fn test_requires_multiple_gate() {
        let mut cfg = ConfigurationSettings::new();
        cfg.config_register(
            Setting::new("PAYMENT", "MODULES", SettingKind::MultipleString)
                .default_value(vec!["DUMMY"]),
        )
        .unwrap();
        cfg.config_register(
            Setting::new("PAYMENT", "PAYPAL_EMAIL", SettingKind::String)
                .requires_value("PAYMENT", "MODULES", "PAYPAL"),
        )
        .unwrap();

        let count = |cfg: &ConfigurationSettings| cfg.group_settings("PAYMENT").unwrap().len();
        assert_eq!(count(&cfg), 1);

        cfg.update("PAYMENT", "MODULES", vec!["DUMMY", "PAYPAL"])
            .unwrap();
        assert_eq!(count(&cfg), 2);
    }

    #[test]
    fn test_gated_group_yields_nothing() {
        let mut cfg = ConfigurationSettings::new();
        cfg.config_register(Setting::new("SHOP", "ENABLE_GIFTS", SettingKind::Boolean))
            .unwrap();
        cfg.config_register_group(
            ConfigurationGroup::new("GIFTS", "Gift certificates").requires("SHOP", "ENABLE_GIFTS"),
        );
        cfg.config_register(Setting::new("GIFTS", "PREFIX", SettingKind::String))
            .unwrap();

        assert!(cfg.group_settings("GIFTS").unwrap().is_empty());
        let prefix = cfg.config_get("GIFTS", "PREFIX").unwrap().clone();
        assert!(!cfg.is_active(&prefix));

        cfg.update("SHOP", "ENABLE_GIFTS", true).unwrap();
        assert_eq!(cfg.group_settings("GIFTS").unwrap().len(), 1);
    }

    #[test]
    fn test_add_preregistered_choice() {
        let mut cfg = ConfigurationSettings::new();
        cfg.config_add_choice("ctg1", "c1", ("a", "Item A"));
        cfg.config_add_choice("ctg1", "c1", ("b", "Item B"));

        cfg.config_register(
            Setting::new("ctg1", "c1", SettingKind::MultipleString)
                .choices([("x", "Item X")]),
        )
        .unwrap();

        let values: Vec<&str> = cfg
            .config_choice_values("ctg1", "c1")
            .unwrap()
            .iter()
            .map(|c| c.value.as_str())
            .collect();
        assert_eq!(values, vec!["x", "a", "b"]);

        cfg.config_add_choice("ctg1", "c1", ("c", "Item C"));
        assert_eq!(cfg.config_choice_values("ctg1", "c1").unwrap().len(), 4);
    }

    #[test]
    fn test_duplicate_registration_last_wins() {
        let mut cfg = ConfigurationSettings::new();
        cfg.config_register(
            Setting::new("SHOP", "NAME", SettingKind::String)
                .default_value("first")
                .choices([("a", "A")]),
        )
        .unwrap();
        cfg.config_register(Setting::new("SHOP", "NAME", SettingKind::String).default_value("second"))
            .unwrap();

        assert_eq!(
            cfg.config_value("SHOP", "NAME").unwrap(),
            SettingValue::from("second")
        );
        assert_eq!(cfg.config_choice_values("SHOP", "NAME").unwrap().len(), 1);
    }

    #[test]
    fn test_reset_for_testing() {
        let mut cfg = registry_with_basic();
        cfg.update("BASIC", "ONE", "changed").unwrap();

        cfg.reset_for_testing();

        assert_eq!(
            cfg.config_value("BASIC", "ONE").unwrap(),
            SettingValue::from("a string value")
        );
        assert!(cfg.drain_changes().is_empty());
        assert!(cfg.config_exists("BASIC", "ONE"));
    }
}
