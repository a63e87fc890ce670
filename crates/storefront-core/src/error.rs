//! # Error Types
//!
//! Domain-specific error types for storefront-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  storefront-core errors (this file)                                    │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Input validation failures (COD range, ...)     │
//! │                                                                         │
//! │  storefront-data errors (separate crate)                               │
//! │  └── DataError        - REST gateway failures (RemoteError, NotFound)  │
//! │                                                                         │
//! │  storefront-services errors                                            │
//! │  └── StoreError       - What the storefront UI sees (serialized)       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DataError → StoreError → UI       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Errors from order assembly and snapshot handling.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An order was requested with no line items.
    ///
    /// ## When This Occurs
    /// - Checkout submitted with an empty cart
    /// - Cart cleared in another tab between review and submit
    #[error("Cannot place an order with no items")]
    EmptyOrder,

    /// The stored order item snapshot could not be read or written.
    ///
    /// ## When This Occurs
    /// - An operator edited the `items` column by hand
    /// - A line item contains a value JSON cannot represent
    #[error("Order items snapshot is invalid: {0}")]
    ItemsSnapshot(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::ItemsSnapshot(err.to_string())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Rejections raised before any remote call is made.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Quantity outside the per-line limit.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., phone number, email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Cash on delivery requested for a total outside the allowed window.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (total: ₦52,000, method: cash on delivery)
    ///      │
    ///      ▼
    /// validate_cod(₦52,000)
    ///      │
    ///      ▼
    /// CashOnDelivery { total: ₦52,000, min: ₦7,000, max: ₦50,000 }
    ///      │
    ///      ▼
    /// UI shows the reason and offers card payment instead
    /// ```
    #[error("Cash on delivery is only available for orders between {min} and {max} (order total {total})")]
    CashOnDelivery { total: Money, min: Money, max: Money },
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cod_error_message() {
        let err = ValidationError::CashOnDelivery {
            total: Money::from_naira(6_999),
            min: Money::from_naira(7_000),
            max: Money::from_naira(50_000),
        };
        assert_eq!(
            err.to_string(),
            "Cash on delivery is only available for orders between ₦7,000.00 and ₦50,000.00 (order total ₦6,999.00)"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "email".to_string(),
        };
        assert_eq!(err.to_string(), "email is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_json_error_converts_to_snapshot_error() {
        let json_err = serde_json::from_str::<Vec<u8>>("not json").unwrap_err();
        let core_err: CoreError = json_err.into();
        assert!(matches!(core_err, CoreError::ItemsSnapshot(_)));
    }
}
