//! # Error Types
//!
//! Domain-specific error types for satchmo-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  satchmo-core errors (this file)                                       │
//! │  ├── CoreError        - Cart, discount and order failures              │
//! │  ├── ConfigError      - Settings registry lookups and coercion         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  satchmo-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Flow: ValidationError/ConfigError → CoreError → DbError → caller      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Discount *validity* is not an error: `Discount::is_valid` returns a
//! `DiscountCheck` carrying the shopper-facing message.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product is not in the cart.
    #[error("Product {0} not in cart")]
    ItemNotInCart(String),

    /// Cart has exceeded maximum allowed items.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Discount totals were read before `calc()` ran.
    ///
    /// ## When This Occurs
    /// Only through a programming mistake: every caller must run
    /// `calc(order)` before reading `total()` or `item_discounts()`.
    #[error("Discount {code} has not been calculated")]
    DiscountNotCalculated { code: String },

    /// Order is not in a state that allows the requested operation.
    #[error("Order {order_id} is {current_status}, cannot perform operation")]
    InvalidOrderStatus {
        order_id: String,
        current_status: String,
    },

    /// Payment amount is invalid.
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// Configuration error (wraps ConfigError).
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Configuration Error
// =============================================================================

/// Settings registry errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Lookup of a setting that was never registered.
    ///
    /// `key` is `GROUP.KEY`, e.g. `TAX.PERCENT`.
    #[error("Setting not set: {key}")]
    SettingNotSet { key: String },

    /// Lookup of a group that was never registered.
    #[error("Configuration group not found: {0}")]
    GroupNotFound(String),

    /// A value could not be coerced to the setting's type.
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// A module setting names an implementation that does not exist.
    #[error("Unknown module '{module}' for {key}")]
    UnknownModule { key: String, module: String },
}

impl ConfigError {
    /// Creates a SettingNotSet error for `group.key`.
    pub fn not_set(group: &str, key: &str) -> Self {
        ConfigError::SettingNotSet {
            key: format!("{}.{}", group, key),
        }
    }

    /// Creates an InvalidValue error.
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Two fields that cannot both be set.
    #[error("{first} and {second} cannot both be set")]
    MutuallyExclusive { first: String, second: String },

    /// Duplicate value (e.g., duplicate discount code).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Convenience type alias for Results with ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::DiscountNotCalculated {
            code: "SPRING10".to_string(),
        };
        assert_eq!(err.to_string(), "Discount SPRING10 has not been calculated");

        let err = ConfigError::not_set("TAX", "PERCENT");
        assert_eq!(err.to_string(), "Setting not set: TAX.PERCENT");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::MutuallyExclusive {
            first: "amount".to_string(),
            second: "percentage".to_string(),
        };
        assert_eq!(err.to_string(), "amount and percentage cannot both be set");
    }

    #[test]
    fn test_errors_convert_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));

        let core_err: CoreError = ConfigError::GroupNotFound("SHOP".to_string()).into();
        assert!(matches!(core_err, CoreError::Config(_)));
    }
}
