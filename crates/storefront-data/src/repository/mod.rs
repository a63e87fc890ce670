//! # Repository Module
//!
//! One repository per backend table. Each holds a shared handle to the
//! gateway and builds REST requests; none keeps state of its own.
//!
//! ## Read/Write Asymmetry
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Reads  (items, list_active, for_product, ...)                          │
//! │    └── Fetched<T>: never fail, degrade to a neutral default             │
//! │                                                                         │
//! │  Writes (add, insert, update_quantity, ...)                             │
//! │    └── DataResult<T>: errors propagate to the caller                    │
//! │                                                                         │
//! │  Best-effort cleanup (cart clear)                                       │
//! │    └── bool: failure logged and swallowed                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod cart;
pub mod order;
pub mod product;
pub mod review;
pub mod stock;
pub mod user;
pub mod wishlist;

pub use cart::CartRepository;
pub use order::OrderRepository;
pub use product::ProductRepository;
pub use review::ReviewRepository;
pub use stock::{NewStockAdjustment, StockAdjustmentRepository};
pub use user::UserRepository;
pub use wishlist::WishlistRepository;

use serde::{Deserialize, Serialize};

// =============================================================================
// Table Names
// =============================================================================

pub const PRODUCTS: &str = "products";
pub const CART: &str = "cart";
pub const WISHLIST: &str = "wishlist";
pub const ORDERS: &str = "orders";
pub const REVIEWS: &str = "reviews";
pub const USERS: &str = "users";
pub const STOCK_ADJUSTMENTS: &str = "stock_adjustments";

/// Backend function that upserts a cart row and accumulates quantity.
pub const ADD_TO_CART_RPC: &str = "add_to_cart";

// =============================================================================
// Upsert Strategy
// =============================================================================

/// How cart and wishlist adds keep one row per (uid, product_id).
///
/// ```text
/// Native      one call, conflict resolved by the backend (atomic)
/// Serialized  per-(uid, product) lock here, then read-then-write
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertStrategy {
    #[default]
    Native,
    Serialized,
}

impl std::str::FromStr for UpsertStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "native" => Ok(UpsertStrategy::Native),
            "serialized" => Ok(UpsertStrategy::Serialized),
            other => Err(format!("Unknown upsert strategy: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_strategy_parse() {
        assert_eq!("native".parse::<UpsertStrategy>().unwrap(), UpsertStrategy::Native);
        assert_eq!(" Serialized ".parse::<UpsertStrategy>().unwrap(), UpsertStrategy::Serialized);
        assert!("optimistic".parse::<UpsertStrategy>().is_err());
        assert_eq!(UpsertStrategy::default(), UpsertStrategy::Native);
    }
}
