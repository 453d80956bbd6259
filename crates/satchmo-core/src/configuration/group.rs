//! Configuration groups.

use serde::{Deserialize, Serialize};

use super::values::{SettingKey, SettingValue};

/// A named, ordered collection of settings.
///
/// A group can be gated exactly like a setting. When the gate is closed,
/// iterating the group yields nothing, whatever the individual settings say.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationGroup {
    pub key: String,
    pub name: String,
    pub ordering: i32,
    pub requires: Option<SettingKey>,
    pub requires_value: Option<SettingValue>,
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl ConfigurationGroup {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        ConfigurationGroup {
            key: key.into(),
            name: name.into(),
            ordering: 0,
            requires: None,
            requires_value: None,
            seq: 0,
        }
    }

    pub fn ordering(mut self, ordering: i32) -> Self {
        self.ordering = ordering;
        self
    }

    /// Gates on another setting being truthy (non-empty for lists).
    pub fn requires(mut self, group: impl Into<String>, key: impl Into<String>) -> Self {
        self.requires = Some(SettingKey::new(group, key));
        self.requires_value = None;
        self
    }

    /// Gates on another setting holding (or, for lists, containing) `value`.
    pub fn requires_value(
        mut self,
        group: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<SettingValue>,
    ) -> Self {
        self.requires = Some(SettingKey::new(group, key));
        self.requires_value = Some(value.into());
        self
    }
}
