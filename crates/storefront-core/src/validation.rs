//! # Validation Module
//!
//! Input validation run before any remote call is made.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront UI                                                │
//! │  └── Form checks, immediate feedback                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: storefront-services (Rust)                                   │
//! │  └── THIS MODULE: quantities, ratings, COD window, contact details     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Hosted Postgres                                              │
//! │  ├── UNIQUE (uid, product_id) on cart and wishlist                     │
//! │  ├── UNIQUE order_number                                               │
//! │  └── CHECK (quantity >= 1), CHECK (rating BETWEEN 1 AND 5)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{COD_MAX_NAIRA, COD_MIN_NAIRA, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Payment Validators
// =============================================================================

/// Checks that an order total qualifies for cash on delivery.
///
/// ## Rules
/// Closed interval: ₦7,000 ≤ total ≤ ₦50,000.
///
/// ## Example
/// ```rust
/// use storefront_core::money::Money;
/// use storefront_core::validation::validate_cod;
///
/// assert!(validate_cod(Money::from_naira(6_999)).is_err());
/// assert!(validate_cod(Money::from_naira(7_000)).is_ok());
/// assert!(validate_cod(Money::from_naira(50_000)).is_ok());
/// assert!(validate_cod(Money::from_naira(50_001)).is_err());
/// ```
pub fn validate_cod(total: Money) -> ValidationResult<()> {
    let min = Money::from_naira(COD_MIN_NAIRA);
    let max = Money::from_naira(COD_MAX_NAIRA);

    if total < min || total > max {
        return Err(ValidationError::CashOnDelivery { total, min, max });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart quantity (1..=999).
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a review rating (1..=5).
pub fn validate_rating(rating: i32) -> ValidationResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(ValidationError::OutOfRange {
            field: "rating".to_string(),
            min: 1,
            max: 5,
        });
    }
    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates that a field is present and not blank.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates an identity-provider uid before it is used as a row filter.
pub fn validate_uid(uid: &str) -> ValidationResult<()> {
    validate_required("uid", uid)?;
    if uid.len() > 128 {
        return Err(ValidationError::TooLong {
            field: "uid".to_string(),
            max: 128,
        });
    }
    Ok(())
}

/// Validates a phone number.
///
/// ## Rules
/// - Optional leading `+`
/// - Spaces and hyphens are ignored
/// - 10 to 15 digits remain
///
/// ## Example
/// ```rust
/// use storefront_core::validation::validate_phone;
///
/// assert!(validate_phone("0803 123 4567").is_ok());
/// assert!(validate_phone("+234-803-123-4567").is_ok());
/// assert!(validate_phone("12345").is_err());
/// ```
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();
    validate_required("phone", phone)?;

    let body = phone.strip_prefix('+').unwrap_or(phone);
    let digits: String = body.chars().filter(|c| *c != ' ' && *c != '-').collect();

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits".to_string(),
        });
    }

    if !(10..=15).contains(&digits.len()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must have between 10 and 15 digits".to_string(),
        });
    }

    Ok(())
}

/// Strips spaces and hyphens so lookups match however the number was typed.
pub fn normalize_phone(phone: &str) -> String {
    phone
        .trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect()
}

/// Validates an email address (shape only).
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    validate_required("email", email)?;

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') => Ok(()),
        _ => Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@example.com".to_string(),
        }),
    }
}

/// Validates a review comment.
pub fn validate_comment(comment: &str) -> ValidationResult<()> {
    if comment.chars().count() > 2_000 {
        return Err(ValidationError::TooLong {
            field: "comment".to_string(),
            max: 2_000,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
