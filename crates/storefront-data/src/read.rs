//! # Tagged Read Results
//!
//! Storefront reads never fail. When the backend cannot answer, the caller
//! still gets a usable value (empty list, zero, `None`), but tagged so it
//! can tell "there is nothing" apart from "we could not look".
//!
//! ```text
//! DataResult<T> ──► Fetched::from_result(result, "cart items")
//!                        │
//!          ┌─────────────┴──────────────┐
//!          ▼                            ▼
//!     Ok(v) → Fresh(v)      Err(e) → warn!(...) → Degraded { T::default(), reason }
//! ```

use serde::Serialize;
use tracing::warn;

use crate::error::DataResult;

/// A read result that may have fallen back to a neutral default.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Fetched<T> {
    /// The backend answered.
    Fresh { value: T },
    /// The backend failed; `value` is the neutral default.
    Degraded { value: T, reason: String },
}

impl<T> Fetched<T> {
    pub fn fresh(value: T) -> Self {
        Fetched::Fresh { value }
    }

    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Fetched::Degraded {
            value,
            reason: reason.into(),
        }
    }

    /// Unwraps the value, discarding the tag.
    pub fn into_value(self) -> T {
        match self {
            Fetched::Fresh { value } | Fetched::Degraded { value, .. } => value,
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Fetched::Fresh { value } | Fetched::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Fetched::Degraded { .. })
    }

    /// Why the read degraded, if it did.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Fetched::Fresh { .. } => None,
            Fetched::Degraded { reason, .. } => Some(reason),
        }
    }

    /// Transforms the value and keeps the tag.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Fetched<U> {
        match self {
            Fetched::Fresh { value } => Fetched::Fresh { value: f(value) },
            Fetched::Degraded { value, reason } => Fetched::Degraded {
                value: f(value),
                reason,
            },
        }
    }
}

impl<T: Default> Fetched<T> {
    /// Converts a fallible read, logging the failure.
    ///
    /// `what` names the read in the log line ("cart items", "product").
    pub fn from_result(result: DataResult<T>, what: &str) -> Self {
        match result {
            Ok(value) => Fetched::fresh(value),
            Err(err) => {
                warn!(read = what, error = %err, "Read failed, returning default");
                Fetched::degraded(T::default(), err.to_string())
            }
        }
    }
}
