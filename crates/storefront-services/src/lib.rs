//! # storefront-services: Storefront Workflows
//!
//! The operations the storefront pages call, built on the repositories in
//! `storefront-data` and the courier and payment providers.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Storefront Services                             │
//! │                                                                         │
//! │  pages / apps/stock-reconciler                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               storefront-services (THIS CRATE)                  │   │
//! │  │                                                                 │   │
//! │  │   Storefront ─┬─► Checkout ─────► orders, cart, products,       │   │
//! │  │   (facade)    │                   stock_adjustments              │   │
//! │  │               ├─► ShippingResolver ──► courier API / flat rates │   │
//! │  │               ├─► PaymentInitiator ──► popup SDK (once)         │   │
//! │  │               ├─► PaystackVerifier ──► verify API               │   │
//! │  │               └─► SessionStore                                  │   │
//! │  │                                                                 │   │
//! │  │   StockReconciler (background) ──► stock_adjustments queue      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  storefront-data (REST gateway, repositories)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - `storefront.toml` + environment overrides
//! - [`checkout`] - Order placement saga
//! - [`shipping`] - Courier rates with flat-rate fallback
//! - [`payment`] - Payment popup, COD check, server-side verification
//! - [`session`] - Signed-in user mirror
//! - [`reconciler`] - Stock adjustment worker
//! - [`storefront`] - Facade for the pages
//! - [`error`] - User-facing error type

pub mod checkout;
pub mod config;
pub mod error;
pub mod payment;
pub mod reconciler;
pub mod session;
pub mod shipping;
pub mod storefront;

pub use checkout::{Checkout, CustomerDetails, DeliveryDetails, OrderRequest, PlacedOrder, StockReport};
pub use config::{ConfigError, StoreConfig};
pub use error::{ErrorCode, StoreError, StoreResult};
pub use payment::{
    PaymentDetails, PaymentHandler, PaymentInitiator, PaymentMetadata, PaymentReceipt, PaymentSdk,
    PaystackVerifier, PopupConfig, PopupOutcome, SdkLoader,
};
pub use reconciler::{ReconcileSummary, StockReconciler, StockReconcilerHandle};
pub use session::{Session, SessionStore};
pub use shipping::ShippingResolver;
pub use storefront::Storefront;
