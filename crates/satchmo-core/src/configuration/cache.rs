//! Memoized setting lookups.
//!
//! A miss is never a failure: the registry recomputes the value from the
//! persisted overrides and the default, then repopulates the entry.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use thiserror::Error;

use super::values::{SettingKey, SettingValue};

/// Returned by [`SettingCache::get`] when the key has no entry.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Not cached: {0}")]
pub struct NotCached(pub String);

/// Process-wide cache of resolved setting values.
///
/// Reads vastly outnumber writes (writes only happen when an operator
/// changes a setting), hence `RwLock`.
#[derive(Debug, Default)]
pub struct SettingCache {
    entries: RwLock<HashMap<SettingKey, SettingValue>>,
}

impl SettingCache {
    pub fn new() -> Self {
        SettingCache::default()
    }

    pub fn get(&self, key: &SettingKey) -> Result<SettingValue, NotCached> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .cloned()
            .ok_or_else(|| NotCached(key.to_string()))
    }

    pub fn set(&self, key: SettingKey, value: SettingValue) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, value);
    }

    /// Removes one entry.
    pub fn delete(&self, key: &SettingKey) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
