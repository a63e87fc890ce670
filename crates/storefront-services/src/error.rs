//! # Store Error Type
//!
//! The one error type the storefront pages see.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Storefront                         │
//! │                                                                         │
//! │  Page                        Services                                   │
//! │  ────                        ────────                                   │
//! │                                                                         │
//! │  storefront.place_order(..)                                             │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Result<T, StoreError>                                           │  │
//! │  │         │                                                        │  │
//! │  │  Validation? ─── ValidationError::CashOnDelivery ──┐            │  │
//! │  │         │                                          ▼            │  │
//! │  │  Remote failure? ── DataError::Remote{..} ──► StoreError ──────►│  │
//! │  │         │          (detail logged, generic       │              │  │
//! │  │         ▼           message returned)            │              │  │
//! │  │  Success ───────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  e.code    = "VALIDATION_ERROR"                                         │
//! │  e.message = "Cash on delivery is only available for orders between …" │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Remote error bodies can carry table names and constraint details, so they
//! are logged and never shown.

use serde::Serialize;
use storefront_core::{CoreError, ValidationError};
use storefront_data::DataError;

use crate::config::ConfigError;

/// Error returned to the storefront pages.
///
/// ```json
/// {
///   "code": "ORDER_FAILED",
///   "message": "We could not place your order. Please try again."
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreError {
    /// Machine-readable error code.
    pub code: ErrorCode,

    /// Message safe to show the customer.
    pub message: String,
}

/// Error codes for storefront failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Record not found.
    NotFound,

    /// Input validation failed (COD range, quantity, rating, ...).
    ValidationError,

    /// The hosted backend rejected or could not serve a write.
    RemoteError,

    /// The order insert failed.
    OrderFailed,

    /// Cart write failed.
    CartError,

    /// Payment popup or verification failed.
    PaymentError,

    /// Page needs a signed-in user.
    Unauthenticated,

    /// Configuration is missing or invalid.
    ConfigError,

    Internal,
}

/// Message shown when the order insert fails.
pub const ORDER_FAILED_MESSAGE: &str = "We could not place your order. Please try again.";

impl StoreError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        StoreError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        StoreError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        StoreError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        StoreError::new(ErrorCode::Internal, message)
    }

    pub fn payment(message: impl Into<String>) -> Self {
        StoreError::new(ErrorCode::PaymentError, message)
    }

    /// The generic order failure. Callers log the cause first.
    pub fn order_failed() -> Self {
        StoreError::new(ErrorCode::OrderFailed, ORDER_FAILED_MESSAGE)
    }

    pub fn unauthenticated() -> Self {
        StoreError::new(ErrorCode::Unauthenticated, "Please sign in to continue")
    }
}

/// Converts data errors to store errors.
impl From<DataError> for StoreError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::NotFound { entity, id } => StoreError::not_found(&entity, &id),
            DataError::Validation(e) => StoreError::validation(e.to_string()),
            DataError::Core(e) => e.into(),
            DataError::InvalidRequest(e) => {
                tracing::error!("Invalid backend request: {}", e);
                StoreError::internal("Something went wrong. Please try again.")
            }
            DataError::Remote { status, body } => {
                // Log the body, return a generic message
                tracing::error!(status, body = %body, "Backend request failed");
                StoreError::new(
                    ErrorCode::RemoteError,
                    "The store is temporarily unavailable. Please try again.",
                )
            }
            DataError::Transport(e) => {
                tracing::error!("Backend unreachable: {}", e);
                StoreError::new(
                    ErrorCode::RemoteError,
                    "Could not reach the store. Check your connection and try again.",
                )
            }
            DataError::Decode(e) => {
                tracing::error!("Unexpected backend response: {}", e);
                StoreError::new(ErrorCode::RemoteError, "The store returned an unexpected response")
            }
        }
    }
}

/// Converts core errors to store errors.
impl From<CoreError> for StoreError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EmptyOrder => StoreError::validation("Your cart is empty"),
            CoreError::ItemsSnapshot(e) => {
                tracing::error!("Order items snapshot invalid: {}", e);
                StoreError::internal("Order items could not be read")
            }
            CoreError::Validation(e) => StoreError::validation(e.to_string()),
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(err: ValidationError) -> Self {
        StoreError::validation(err.to_string())
    }
}

impl From<ConfigError> for StoreError {
    fn from(err: ConfigError) -> Self {
        tracing::error!("Configuration error: {}", err);
        StoreError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::Money;

    #[test]
    fn test_remote_error_hides_body() {
        let err: StoreError = DataError::remote(500, r#"{"message":"relation \"orders\" does not exist"}"#).into();
        assert_eq!(err.code, ErrorCode::RemoteError);
        assert!(!err.message.contains("relation"));
    }

    #[test]
    fn test_cod_reason_reaches_the_customer() {
        let err: StoreError = ValidationError::CashOnDelivery {
            total: Money::from_naira(60_000),
            min: Money::from_naira(7_000),
            max: Money::from_naira(50_000),
        }
        .into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("₦50,000.00"));
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(StoreError::order_failed()).unwrap();
        assert_eq!(json["code"], "ORDER_FAILED");
        assert_eq!(json["message"], ORDER_FAILED_MESSAGE);
    }

    #[test]
    fn test_not_found_maps_through() {
        let err: StoreError = DataError::not_found("User", "08030000000").into();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.to_string(), "[NotFound] User not found: 08030000000");
    }
}
