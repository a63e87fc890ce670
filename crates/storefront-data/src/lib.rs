//! # storefront-data: Remote Data Layer for the Storefront
//!
//! Every read and write of product, cart, wishlist, review and order
//! records goes through this crate to the hosted Postgres REST backend.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Storefront Data Flow                               │
//! │                                                                         │
//! │  storefront-services (checkout, cart actions, reconciler)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 storefront-data (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Backend     │    │  Repositories │    │   Gateway    │   │   │
//! │  │   │ (backend.rs)  │    │               │    │              │   │   │
//! │  │   │               │    │ Product  Cart │    │ HttpGateway  │   │   │
//! │  │   │ strategy      │───►│ Wishlist      │───►│ (reqwest)    │   │   │
//! │  │   │ keyed locks   │    │ Order  Review │    │ MemoryGateway│   │   │
//! │  │   │               │    │ User   Stock  │    │ (testing)    │   │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Hosted Postgres behind a REST layer                  │   │
//! │  │   https://<project>.supabase.co/rest/v1                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`gateway`] - The one HTTP call, plus the `RestGateway` seam
//! - [`query`] - Query-string filter builder
//! - [`read`] - `Fetched<T>` tagged read results
//! - [`backend`] - Handle that hands out repositories
//! - [`repository`] - One repository per table
//! - [`locks`] - Per-key locks for the Serialized upsert strategy
//! - [`schema`] - Embedded backend migrations
//! - [`error`] - Data error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_data::{Backend, GatewayConfig};
//!
//! let backend = Backend::http(GatewayConfig::new(rest_url, api_key));
//!
//! let outcome = backend.cart().add(&uid, &product, 1).await?;
//! let items = backend.cart().items(&uid).await;
//! if items.is_degraded() {
//!     // show a "could not load your cart" banner
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod backend;
pub mod error;
pub mod gateway;
pub mod locks;
pub mod query;
pub mod read;
pub mod repository;
pub mod schema;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use backend::Backend;
pub use error::{DataError, DataResult};
pub use gateway::{GatewayConfig, HttpGateway, Method, Prefer, RestGateway, RestRequest};
pub use query::{Direction, Query};
pub use read::Fetched;

// Repository re-exports for convenience
pub use repository::cart::CartRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
pub use repository::review::ReviewRepository;
pub use repository::stock::{NewStockAdjustment, StockAdjustmentRepository};
pub use repository::user::UserRepository;
pub use repository::wishlist::WishlistRepository;
pub use repository::UpsertStrategy;
