//! # Backend Handle
//!
//! Bundles the gateway with the upsert settings and hands out repositories.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Backend                                         │
//! │                                                                         │
//! │  GatewayConfig { rest_url, api_key }                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Backend::http(config) ← or Backend::new(Arc<dyn RestGateway>)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                            │
//! │  │  Arc<dyn RestGateway>  (shared)          │                            │
//! │  │  UpsertStrategy        (Native default)  │                            │
//! │  │  KeyedLocks            (Serialized only) │                            │
//! │  └─────────────────────────────────────────┘                            │
//! │       │                                                                 │
//! │       ├──► products()   cart()   wishlist()                             │
//! │       ├──► orders()     reviews() users()                               │
//! │       └──► stock_adjustments()                                          │
//! │                                                                         │
//! │  Repositories are cheap clones; the lock map is shared by all of them.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tracing::info;

use crate::gateway::{GatewayConfig, HttpGateway, RestGateway, RestRequest};
use crate::locks::KeyedLocks;
use crate::query::Query;
use crate::repository::{
    CartRepository, OrderRepository, ProductRepository, ReviewRepository,
    StockAdjustmentRepository, UpsertStrategy, UserRepository, WishlistRepository, PRODUCTS,
};

/// Main backend handle providing repository access.
///
/// ## Usage
/// ```rust,ignore
/// let backend = Backend::http(GatewayConfig::new(url, key));
/// let items = backend.cart().items(&uid).await.into_value();
/// ```
#[derive(Clone)]
pub struct Backend {
    gateway: Arc<dyn RestGateway>,
    upsert: UpsertStrategy,
    locks: KeyedLocks,
}

impl Backend {
    /// Wraps any gateway, using the native upsert strategy.
    pub fn new(gateway: Arc<dyn RestGateway>) -> Self {
        Backend {
            gateway,
            upsert: UpsertStrategy::default(),
            locks: KeyedLocks::new(),
        }
    }

    /// Connects to the hosted REST backend over HTTP.
    pub fn http(config: GatewayConfig) -> Self {
        info!(rest_url = %config.rest_url(), "Configuring REST backend");
        Backend::new(Arc::new(HttpGateway::new(config)))
    }

    /// Sets how cart and wishlist adds are kept to one row per pair.
    pub fn with_upsert_strategy(mut self, strategy: UpsertStrategy) -> Self {
        self.upsert = strategy;
        self
    }

    pub fn upsert_strategy(&self) -> UpsertStrategy {
        self.upsert
    }

    /// The underlying gateway, for calls not covered by a repository.
    pub fn gateway(&self) -> Arc<dyn RestGateway> {
        self.gateway.clone()
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.gateway.clone())
    }

    pub fn cart(&self) -> CartRepository {
        CartRepository::new(self.gateway.clone(), self.upsert, self.locks.clone())
    }

    pub fn wishlist(&self) -> WishlistRepository {
        WishlistRepository::new(self.gateway.clone(), self.upsert, self.locks.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.gateway.clone())
    }

    pub fn reviews(&self) -> ReviewRepository {
        ReviewRepository::new(self.gateway.clone())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.gateway.clone())
    }

    pub fn stock_adjustments(&self) -> StockAdjustmentRepository {
        StockAdjustmentRepository::new(self.gateway.clone())
    }

    /// Checks that the backend answers a trivial read.
    pub async fn health_check(&self) -> bool {
        self.gateway
            .execute(RestRequest::get(PRODUCTS).query(Query::new().select("id").limit(1)))
            .await
            .is_ok()
    }
}
