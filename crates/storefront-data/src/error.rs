//! # Data Error Types
//!
//! Error types for remote data operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  HTTP response (non-2xx) / reqwest::Error / bad JSON                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DataError (this module) ← Keeps status and raw body                    │
//! │       │                                                                 │
//! │       ├──► reads:  logged, neutral default tagged Degraded              │
//! │       │                                                                 │
//! │       └──► writes: StoreError (services) ← generic message for the UI   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use storefront_core::{CoreError, ValidationError};
use thiserror::Error;

/// Remote data operation errors.
#[derive(Debug, Error)]
pub enum DataError {
    /// The backend answered with a non-success status.
    ///
    /// ## When This Occurs
    /// - Constraint violation (duplicate order number, CHECK failure)
    /// - Row-level security rejected the request
    /// - Bad API key (401)
    /// - Backend outage (5xx)
    #[error("Remote request failed with status {status}: {body}")]
    Remote { status: u16, body: String },

    /// A record that must exist was not found.
    ///
    /// ## When This Occurs
    /// - Phone-based login lookup with no matching user
    /// - Stock read for a product that was deleted
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The request never produced a response.
    ///
    /// ## When This Occurs
    /// - DNS failure, connection refused, TLS failure
    /// - Connection dropped while reading the body
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body was not the JSON shape expected.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The request could not be built (bad base URL, bad path).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Input rejected before any call was made.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Domain rule violation surfaced by the core crate.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl DataError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DataError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Remote error from a status and response body.
    pub fn remote(status: u16, body: impl Into<String>) -> Self {
        DataError::Remote {
            status,
            body: body.into(),
        }
    }

    /// Returns true if repeating the same request later may succeed.
    ///
    /// ## Retryable
    /// - Transport failures
    /// - 408, 429 and 5xx responses
    pub fn is_retryable(&self) -> bool {
        match self {
            DataError::Transport(_) => true,
            DataError::Remote { status, .. } => {
                *status == 408 || *status == 429 || (500..600).contains(status)
            }
            _ => false,
        }
    }

    /// Returns true for a 409 or a Postgres unique violation (23505).
    pub fn is_conflict(&self) -> bool {
        match self {
            DataError::Remote { status, body } => *status == 409 || body.contains("23505"),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DataError::Decode(err.to_string())
        } else if err.is_builder() {
            DataError::InvalidRequest(err.to_string())
        } else {
            DataError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for DataError {
    fn from(err: url::ParseError) -> Self {
        DataError::InvalidRequest(err.to_string())
    }
}

/// Result type for remote data operations.
pub type DataResult<T> = Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(DataError::Transport("refused".into()).is_retryable());
        assert!(DataError::remote(503, "").is_retryable());
        assert!(DataError::remote(429, "").is_retryable());
        assert!(!DataError::remote(400, "bad filter").is_retryable());
        assert!(!DataError::not_found("User", "0803").is_retryable());
    }

    #[test]
    fn test_conflict_detection() {
        let err = DataError::remote(
            409,
            r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#,
        );
        assert!(err.is_conflict());
        assert!(!DataError::remote(500, "boom").is_conflict());
    }

    #[test]
    fn test_remote_error_keeps_body() {
        let err = DataError::remote(401, r#"{"message":"Invalid API key"}"#);
        assert_eq!(
            err.to_string(),
            r#"Remote request failed with status 401: {"message":"Invalid API key"}"#
        );
    }
}
