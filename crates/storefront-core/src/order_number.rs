//! # Order Numbers
//!
//! Customer-facing order numbers look like `MC-2026-483920`: a fixed prefix,
//! the year the order was placed, and a random six-digit suffix.
//!
//! Uniqueness is probabilistic. The `orders.order_number` column carries a
//! UNIQUE constraint, so a collision surfaces as a failed insert rather than
//! two orders sharing a number.

use rand::Rng;

use crate::ORDER_NUMBER_PREFIX;

/// Lowest suffix value (inclusive).
pub const SUFFIX_MIN: u32 = 100_000;

/// Highest suffix value (inclusive).
pub const SUFFIX_MAX: u32 = 999_999;

/// Generates an order number for `year` using the supplied RNG.
///
/// ## Example
/// ```rust
/// use storefront_core::order_number::{generate_order_number, is_valid_order_number};
///
/// let number = generate_order_number(2026, &mut rand::thread_rng());
/// assert!(number.starts_with("MC-2026-"));
/// assert!(is_valid_order_number(&number));
/// ```
pub fn generate_order_number<R: Rng + ?Sized>(year: i32, rng: &mut R) -> String {
    let suffix = rng.gen_range(SUFFIX_MIN..=SUFFIX_MAX);
    format!("{}-{:04}-{}", ORDER_NUMBER_PREFIX, year, suffix)
}

/// Parses an order number into `(year, suffix)`.
pub fn parse_order_number(value: &str) -> Option<(i32, u32)> {
    let mut parts = value.split('-');
    let prefix = parts.next()?;
    let year = parts.next()?;
    let suffix = parts.next()?;

    if prefix != ORDER_NUMBER_PREFIX || parts.next().is_some() {
        return None;
    }
    if year.len() != 4 || suffix.len() != 6 {
        return None;
    }
    if !year.bytes().all(|b| b.is_ascii_digit()) || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let year: i32 = year.parse().ok()?;
    let suffix: u32 = suffix.parse().ok()?;
    (SUFFIX_MIN..=SUFFIX_MAX).contains(&suffix).then_some((year, suffix))
}

/// Checks the `MC-YYYY-NNNNNN` format.
pub fn is_valid_order_number(value: &str) -> bool {
    parse_order_number(value).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generated_numbers_match_format() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let number = generate_order_number(2026, &mut rng);
            let (year, suffix) = parse_order_number(&number).unwrap();
            assert_eq!(year, 2026);
            assert!((SUFFIX_MIN..=SUFFIX_MAX).contains(&suffix), "{number}");
        }
    }

    #[test]
    fn test_parse_rejects_malformed_numbers() {
        assert!(is_valid_order_number("MC-2026-100000"));
        assert!(is_valid_order_number("MC-2026-999999"));

        assert!(!is_valid_order_number("MC-2026-099999"));
        assert!(!is_valid_order_number("MC-26-123456"));
        assert!(!is_valid_order_number("XX-2026-123456"));
        assert!(!is_valid_order_number("MC-2026-1234567"));
        assert!(!is_valid_order_number("MC-2026-12345a"));
        assert!(!is_valid_order_number("MC-2026-123456-1"));
        assert!(!is_valid_order_number(""));
    }
}
