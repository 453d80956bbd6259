//! Setting definitions and typed values.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Setting Key
// =============================================================================

/// Identity of a setting: `(group, key)`, displayed as `GROUP.KEY`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SettingKey {
    pub group: String,
    pub key: String,
}

impl SettingKey {
    pub fn new(group: impl Into<String>, key: impl Into<String>) -> Self {
        SettingKey {
            group: group.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.key)
    }
}

// =============================================================================
// Setting Kind
// =============================================================================

/// The declared type of a setting.
///
/// Several kinds share a [`SettingValue`] representation: `LongString` and
/// `Password` hold strings, `PositiveInteger` holds an integer that must
/// not be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKind {
    Boolean,
    Integer,
    PositiveInteger,
    Decimal,
    /// Length of time in whole seconds.
    Duration,
    String,
    LongString,
    Password,
    /// Reference to a statically linked implementation, by stable key.
    Module,
    MultipleString,
}

impl SettingKind {
    /// Value used when a setting declares no default.
    pub fn empty_value(&self) -> SettingValue {
        match self {
            SettingKind::Boolean => SettingValue::Boolean(false),
            SettingKind::Integer | SettingKind::PositiveInteger => SettingValue::Integer(0),
            SettingKind::Decimal => SettingValue::Decimal(Decimal::ZERO),
            SettingKind::Duration => SettingValue::Duration(0),
            SettingKind::String | SettingKind::LongString | SettingKind::Password => {
                SettingValue::String(String::new())
            }
            SettingKind::Module => SettingValue::Module(String::new()),
            SettingKind::MultipleString => SettingValue::MultipleString(Vec::new()),
        }
    }

    /// Whether values of this kind are multi-valued for gating purposes.
    pub fn is_multiple(&self) -> bool {
        matches!(self, SettingKind::MultipleString)
    }

    /// Parses a raw storage string into a typed value.
    ///
    /// This is the inverse of [`SettingValue::to_storage`].
    pub fn parse(&self, key: &SettingKey, raw: &str) -> ConfigResult<SettingValue> {
        let invalid = |reason: String| ConfigError::invalid(key.to_string(), reason);

        match self {
            SettingKind::Boolean => match raw.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(SettingValue::Boolean(true)),
                "false" | "0" | "no" | "off" | "" => Ok(SettingValue::Boolean(false)),
                other => Err(invalid(format!("'{}' is not a boolean", other))),
            },
            SettingKind::Integer | SettingKind::PositiveInteger => {
                let n = raw
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| invalid(format!("'{}' is not an integer: {}", raw, e)))?;
                self.coerce(key, SettingValue::Integer(n))
            }
            SettingKind::Decimal => Decimal::from_str(raw.trim())
                .map(SettingValue::Decimal)
                .map_err(|e| invalid(format!("'{}' is not a decimal: {}", raw, e))),
            SettingKind::Duration => raw
                .trim()
                .parse::<i64>()
                .map(SettingValue::Duration)
                .map_err(|e| invalid(format!("'{}' is not a number of seconds: {}", raw, e))),
            SettingKind::String | SettingKind::LongString | SettingKind::Password => {
                Ok(SettingValue::String(raw.to_string()))
            }
            SettingKind::Module => Ok(SettingValue::Module(raw.trim().to_string())),
            SettingKind::MultipleString => serde_json::from_str::<Vec<String>>(raw)
                .map(SettingValue::MultipleString)
                .map_err(|e| invalid(format!("not a JSON list of strings: {}", e))),
        }
    }

    /// Converts a value to this kind, or explains why it can't be.
    ///
    /// Strings are parsed, so `"true"` is accepted for a boolean and
    /// `"tax.modules.percent"` for a module.
    pub fn coerce(&self, key: &SettingKey, value: SettingValue) -> ConfigResult<SettingValue> {
        match (self, value) {
            (SettingKind::Boolean, v @ SettingValue::Boolean(_)) => Ok(v),
            (SettingKind::Integer, v @ SettingValue::Integer(_)) => Ok(v),
            (SettingKind::PositiveInteger, SettingValue::Integer(n)) if n < 0 => Err(
                ConfigError::invalid(key.to_string(), format!("{} is negative", n)),
            ),
            (SettingKind::PositiveInteger, v @ SettingValue::Integer(_)) => Ok(v),
            (SettingKind::Decimal, v @ SettingValue::Decimal(_)) => Ok(v),
            (SettingKind::Decimal, SettingValue::Integer(n)) => {
                Ok(SettingValue::Decimal(Decimal::from(n)))
            }
            (SettingKind::Duration, v @ SettingValue::Duration(_)) => Ok(v),
            (SettingKind::Duration, SettingValue::Integer(n)) => Ok(SettingValue::Duration(n)),
            (
                SettingKind::String | SettingKind::LongString | SettingKind::Password,
                v @ SettingValue::String(_),
            ) => Ok(v),
            (SettingKind::Module, v @ SettingValue::Module(_)) => Ok(v),
            (SettingKind::MultipleString, v @ SettingValue::MultipleString(_)) => Ok(v),
            (kind, SettingValue::String(raw)) => kind.parse(key, &raw),
            (kind, other) => Err(ConfigError::invalid(
                key.to_string(),
                format!("{} value cannot be stored in a {:?} setting", other.type_name(), kind),
            )),
        }
    }
}

// =============================================================================
// Setting Value
// =============================================================================

/// A typed setting value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SettingValue {
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    Duration(i64),
    String(String),
    Module(String),
    MultipleString(Vec<String>),
}

impl SettingValue {
    fn type_name(&self) -> &'static str {
        match self {
            SettingValue::Boolean(_) => "boolean",
            SettingValue::Integer(_) => "integer",
            SettingValue::Decimal(_) => "decimal",
            SettingValue::Duration(_) => "duration",
            SettingValue::String(_) => "string",
            SettingValue::Module(_) => "module",
            SettingValue::MultipleString(_) => "list",
        }
    }

    /// Serializes the value for the `settings` table.
    pub fn to_storage(&self) -> String {
        match self {
            SettingValue::Boolean(b) => b.to_string(),
            SettingValue::Integer(n) | SettingValue::Duration(n) => n.to_string(),
            SettingValue::Decimal(d) => d.to_string(),
            SettingValue::String(s) | SettingValue::Module(s) => s.clone(),
            SettingValue::MultipleString(list) => {
                serde_json::to_string(list).unwrap_or_else(|_| "[]".to_string())
            }
        }
    }

    /// Truthiness used by gates without an explicit required value.
    pub fn is_truthy(&self) -> bool {
        match self {
            SettingValue::Boolean(b) => *b,
            SettingValue::Integer(n) | SettingValue::Duration(n) => *n != 0,
            SettingValue::Decimal(d) => !d.is_zero(),
            SettingValue::String(s) | SettingValue::Module(s) => !s.is_empty(),
            SettingValue::MultipleString(list) => !list.is_empty(),
        }
    }

    /// Evaluates a `requires` gate against this (the required setting's) value.
    ///
    /// - list values: `required ∈ self`, or non-empty when no value is given
    /// - scalar values: `self == required`, or truthy when no value is given
    pub fn satisfies(&self, required: Option<&SettingValue>) -> bool {
        match (self, required) {
            (SettingValue::MultipleString(list), Some(required)) => {
                let wanted = required.to_storage();
                list.iter().any(|item| *item == wanted)
            }
            (_, None) => self.is_truthy(),
            (value, Some(required)) => value == required || scalar_text_eq(value, required),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SettingValue::Integer(n) | SettingValue::Duration(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            SettingValue::Decimal(d) => Some(*d),
            SettingValue::Integer(n) => Some(Decimal::from(*n)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) | SettingValue::Module(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            SettingValue::MultipleString(list) => Some(list),
            _ => None,
        }
    }
}

// A module gate is usually written with a plain string required value.
fn scalar_text_eq(value: &SettingValue, required: &SettingValue) -> bool {
    match (value, required) {
        (SettingValue::Module(a), SettingValue::String(b))
        | (SettingValue::String(a), SettingValue::Module(b)) => a == b,
        _ => false,
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::MultipleString(list) => write!(f, "[{}]", list.join(", ")),
            other => write!(f, "{}", other.to_storage()),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Boolean(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Integer(value)
    }
}

impl From<Decimal> for SettingValue {
    fn from(value: Decimal) -> Self {
        SettingValue::Decimal(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::String(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::String(value)
    }
}

impl From<Vec<String>> for SettingValue {
    fn from(value: Vec<String>) -> Self {
        SettingValue::MultipleString(value)
    }
}

impl From<Vec<&str>> for SettingValue {
    fn from(value: Vec<&str>) -> Self {
        SettingValue::MultipleString(value.into_iter().map(str::to_string).collect())
    }
}

// =============================================================================
// Defaults and Choices
// =============================================================================

/// Default for a setting, possibly computed on first use.
#[derive(Clone, Default)]
pub enum DefaultValue {
    /// No declared default; the kind's empty value is used.
    #[default]
    Empty,
    Value(SettingValue),
    Lazy(Arc<dyn Fn() -> SettingValue + Send + Sync>),
}

impl DefaultValue {
    /// Fully resolves the default.
    pub fn resolve(&self, kind: SettingKind) -> SettingValue {
        match self {
            DefaultValue::Empty => kind.empty_value(),
            DefaultValue::Value(v) => v.clone(),
            DefaultValue::Lazy(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Empty => write!(f, "Empty"),
            DefaultValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
            DefaultValue::Lazy(_) => write!(f, "Lazy(..)"),
        }
    }
}

/// One selectable option: stored value and display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Choice {
            value: value.into(),
            label: label.into(),
        }
    }
}

impl From<(&str, &str)> for Choice {
    fn from((value, label): (&str, &str)) -> Self {
        Choice::new(value, label)
    }
}

// =============================================================================
// Setting
// =============================================================================

/// A registered configuration entry.
///
/// ## Example
/// ```rust
/// use satchmo_core::configuration::{Setting, SettingKind};
///
/// let percent = Setting::new("TAX", "PERCENT", SettingKind::Decimal)
///     .description("Percent tax")
///     .default_value("8.25")
///     .requires_value("TAX", "MODULE", "tax.modules.percent");
/// assert_eq!(percent.setting_key().to_string(), "TAX.PERCENT");
/// ```
#[derive(Debug, Clone)]
pub struct Setting {
    pub group: String,
    pub key: String,
    pub kind: SettingKind,
    pub description: String,
    pub help_text: Option<String>,
    pub default: DefaultValue,
    pub choices: Vec<Choice>,
    pub requires: Option<SettingKey>,
    pub requires_value: Option<SettingValue>,
    pub ordering: i32,
    pub hidden: bool,
    /// Registration sequence, used to break ordering ties.
    pub(crate) seq: u64,
}

impl Setting {
    pub fn new(group: impl Into<String>, key: impl Into<String>, kind: SettingKind) -> Self {
        let key = key.into();
        Setting {
            group: group.into(),
            description: key.clone(),
            key,
            kind,
            help_text: None,
            default: DefaultValue::Empty,
            choices: Vec::new(),
            requires: None,
            requires_value: None,
            ordering: 0,
            hidden: false,
            seq: 0,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn help_text(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = Some(help_text.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<SettingValue>) -> Self {
        self.default = DefaultValue::Value(value.into());
        self
    }

    /// Default computed the first time the value is read.
    pub fn lazy_default<F>(mut self, f: F) -> Self
    where
        F: Fn() -> SettingValue + Send + Sync + 'static,
    {
        self.default = DefaultValue::Lazy(Arc::new(f));
        self
    }

    pub fn choices<I, C>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Choice>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
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

    pub fn ordering(mut self, ordering: i32) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn setting_key(&self) -> SettingKey {
        SettingKey::new(&self.group, &self.key)
    }

    /// The resolved default, coerced to the setting's kind.
    pub fn default_value_resolved(&self) -> ConfigResult<SettingValue> {
        self.kind
            .coerce(&self.setting_key(), self.default.resolve(self.kind))
    }
}
