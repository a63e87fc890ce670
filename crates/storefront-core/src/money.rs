//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Kobo?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  The backend stores prices as JSON numbers in naira:                    │
//! │    { "price": 2499.99 }                                                 │
//! │                                                                         │
//! │  Summing those as floats drifts:                                        │
//! │    2499.99 × 3 = 7499.969999999999  ❌                                  │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Kobo (1 naira = 100 kobo)                        │
//! │    249999 kobo × 3 = 749997 kobo  ✅                                    │
//! │                                                                         │
//! │  Naira only exists at the edges: the `naira` serde adapter converts    │
//! │  wire numbers to kobo on the way in and back on the way out.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use storefront_core::money::Money;
//!
//! let price = Money::from_naira(2_500);
//! let line = price.multiply_quantity(3);
//! assert_eq!(line.kobo(), 750_000);
//! assert_eq!(line.to_string(), "₦7,500.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in kobo, the minor unit of the Nigerian naira.
///
/// ## Design Decisions
/// - **i64 (signed)**: subtraction never panics on discounts or refunds
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Serialized as kobo** by default; wire fields opt into [`naira`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from kobo.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// let price = Money::from_kobo(249_950); // ₦2,499.50
    /// assert_eq!(price.kobo(), 249_950);
    /// ```
    #[inline]
    pub const fn from_kobo(kobo: i64) -> Self {
        Money(kobo)
    }

    /// Creates a Money value from whole naira.
    #[inline]
    pub const fn from_naira(naira: i64) -> Self {
        Money(naira * 100)
    }

    /// Creates a Money value from a decimal naira amount, rounding to the
    /// nearest kobo.
    ///
    /// Returns `None` for NaN and infinities.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// assert_eq!(Money::from_naira_f64(2499.99), Some(Money::from_kobo(249_999)));
    /// assert_eq!(Money::from_naira_f64(f64::NAN), None);
    /// ```
    pub fn from_naira_f64(naira: f64) -> Option<Self> {
        let kobo = (naira * 100.0).round();
        if !kobo.is_finite() || kobo < i64::MIN as f64 || kobo >= i64::MAX as f64 {
            return None;
        }
        Some(Money(kobo as i64))
    }

    /// Returns the value in kobo.
    #[inline]
    pub const fn kobo(&self) -> i64 {
        self.0
    }

    /// Returns the whole-naira portion.
    #[inline]
    pub const fn naira(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the kobo portion (always 0-99).
    #[inline]
    pub const fn kobo_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns the value as a decimal naira amount (for wire output only).
    #[inline]
    pub fn as_naira_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Product: Ankara Tote ₦4,500
    /// Quantity: 3
    ///      │
    ///      ▼
    /// multiply_quantity(3) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Line Total: ₦13,500
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money as `₦12,345.67`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.naira().abs().to_string();

        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        write!(f, "{}₦{}.{:02}", sign, grouped, self.kobo_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Naira Wire Adapter
// =============================================================================

/// Serde adapter for fields the backend stores as naira numbers.
///
/// ## Accepted Input
/// ```text
/// 2500        → 250000 kobo
/// 2499.99     → 249999 kobo
/// "2499.99"   → 249999 kobo   (numeric strings from hand-edited rows)
/// null        → 0 kobo        (use `naira::option` to keep None)
/// ```
///
/// Output is an integer when the amount is whole naira, a decimal otherwise.
///
/// ## Usage
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use storefront_core::money::{naira, Money};
///
/// #[derive(Serialize, Deserialize)]
/// struct Row {
///     #[serde(with = "naira")]
///     price: Money,
/// }
///
/// let row: Row = serde_json::from_str(r#"{"price": 2499.99}"#).unwrap();
/// assert_eq!(row.price.kobo(), 249_999);
/// ```
pub mod naira {
    use super::Money;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(money: &Money, serializer: S) -> Result<S::Ok, S::Error> {
        if money.kobo_part() == 0 {
            serializer.serialize_i64(money.naira())
        } else {
            serializer.serialize_f64(money.as_naira_f64())
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
        let value = Value::deserialize(deserializer)?;
        from_value(&value)
            .map(|m| m.unwrap_or_default())
            .map_err(D::Error::custom)
    }

    /// Converts a JSON value holding naira into `Money`.
    ///
    /// `null` maps to `Ok(None)`.
    pub fn from_value(value: &Value) -> Result<Option<Money>, String> {
        match value {
            Value::Null => Ok(None),
            Value::Number(n) => {
                if let Some(whole) = n.as_i64() {
                    whole
                        .checked_mul(100)
                        .map(|kobo| Some(Money::from_kobo(kobo)))
                        .ok_or_else(|| format!("amount out of range: {}", n))
                } else {
                    n.as_f64()
                        .and_then(Money::from_naira_f64)
                        .map(Some)
                        .ok_or_else(|| format!("amount out of range: {}", n))
                }
            }
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Money::from_naira_f64)
                .map(Some)
                .ok_or_else(|| format!("invalid amount: {:?}", s)),
            other => Err(format!("expected a naira amount, got {}", other)),
        }
    }

    /// Same adapter for `Option<Money>` fields.
    pub mod option {
        use super::super::Money;
        use serde::de::Error as _;
        use serde::{Deserialize, Deserializer, Serializer};
        use serde_json::Value;

        pub fn serialize<S: Serializer>(
            money: &Option<Money>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match money {
                Some(m) => super::serialize(m, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Money>, D::Error> {
            let value = Value::deserialize(deserializer)?;
            super::from_value(&value).map_err(D::Error::custom)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
