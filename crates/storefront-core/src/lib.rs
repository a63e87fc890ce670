//! # storefront-core: Pure Business Logic for the Storefront
//!
//! Everything in this crate is a pure function or a plain data type. The
//! REST backend, the courier API and the payment popup all live further up
//! the stack; nothing here touches the network, the disk or the clock.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Storefront Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    storefront-services                          │   │
//! │  │   Checkout ──► Shipping ──► Payment ──► Stock reconciler        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    storefront-data                              │   │
//! │  │   REST gateway, cart / wishlist / order repositories            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ storefront-core (THIS CRATE) ★                  │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌───────────┐ ┌────────────┐ ┌──────────────┐   │   │
//! │  │   │  types   │ │ normalize │ │ validation │ │   shipping   │   │   │
//! │  │   │ Product  │ │ display   │ │ COD range  │ │ flat-rate    │   │   │
//! │  │   │ Order    │ │ price     │ │ quantity   │ │ fallback     │   │   │
//! │  │   └──────────┘ └───────────┘ └────────────┘ └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • PURE FUNCTIONS                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, CartItem, Order, Review, ...)
//! - [`money`] - Money type in kobo, plus the naira wire adapter
//! - [`normalize`] - Product normalizer (display price resolution)
//! - [`order_number`] - `MC-<year>-<6 digits>` order numbers
//! - [`shipping`] - Shipping wire types and the flat-rate fallback table
//! - [`validation`] - Business rule validation (COD range, quantities)
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use storefront_core::money::Money;
//! use storefront_core::validation::validate_cod;
//!
//! let total = Money::from_naira(12_500);
//! assert!(validate_cod(total).is_ok());
//! assert!(validate_cod(Money::from_naira(50_001)).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod normalize;
pub mod order_number;
pub mod shipping;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use normalize::normalize_product;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Smallest order total accepted for cash on delivery, in naira.
///
/// ## Business Reason
/// Riders carry cash back to the hub; orders below this value cost more to
/// deliver than they earn.
pub const COD_MIN_NAIRA: i64 = 7_000;

/// Largest order total accepted for cash on delivery, in naira.
///
/// ## Business Reason
/// Caps the cash a rider holds on a single drop.
pub const COD_MAX_NAIRA: i64 = 50_000;

/// Maximum quantity of a single product in one cart line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Name given to products stored without a name or a title.
pub const UNNAMED_PRODUCT: &str = "Unnamed Product";

/// Prefix of every order number.
pub const ORDER_NUMBER_PREFIX: &str = "MC";
