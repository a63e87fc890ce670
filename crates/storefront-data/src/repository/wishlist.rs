//! # Wishlist Repository
//!
//! One row per (uid, product_id). Adding a product twice is a no-op that
//! reports `AlreadyExists`, never an error.

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::error::DataResult;
use crate::gateway::{decode_first, decode_rows, Prefer, RestGateway, RestRequest};
use crate::locks::{pair_key, KeyedLocks};
use crate::query::{Direction, Query};
use crate::read::Fetched;
use crate::repository::{UpsertStrategy, WISHLIST};
use storefront_core::{Product, WishlistAddOutcome, WishlistItem};

/// Repository for the `wishlist` table.
#[derive(Clone)]
pub struct WishlistRepository {
    gateway: Arc<dyn RestGateway>,
    strategy: UpsertStrategy,
    locks: KeyedLocks,
}

impl WishlistRepository {
    pub fn new(gateway: Arc<dyn RestGateway>, strategy: UpsertStrategy, locks: KeyedLocks) -> Self {
        WishlistRepository {
            gateway,
            strategy,
            locks,
        }
    }

    fn pair(uid: &str, product_id: &str) -> Query {
        Query::new().eq("uid", uid).eq("product_id", product_id)
    }

    /// Saves a product to the user's wishlist.
    ///
    /// ## Native
    /// A single insert with `on_conflict=uid,product_id` and
    /// `resolution=ignore-duplicates`. The backend echoes the inserted rows,
    /// so an empty echo means the pair was already present.
    ///
    /// ## Serialized
    /// Keyed lock, then check-then-insert.
    pub async fn add(&self, uid: &str, product: &Product) -> DataResult<WishlistAddOutcome> {
        debug!(uid = %uid, product_id = %product.id, "Adding to wishlist");

        let row = serde_json::to_value(WishlistItem::snapshot(uid, product))?;

        match self.strategy {
            UpsertStrategy::Native => {
                let value = self
                    .gateway
                    .execute(
                        RestRequest::post(WISHLIST, row)
                            .query(Query::new().on_conflict(&["uid", "product_id"]))
                            .prefer(Prefer::ReturnRepresentation)
                            .prefer(Prefer::IgnoreDuplicates),
                    )
                    .await?;

                let inserted: Vec<Value> = decode_rows(value)?;
                Ok(if inserted.is_empty() {
                    WishlistAddOutcome::AlreadyExists
                } else {
                    WishlistAddOutcome::Added
                })
            }
            UpsertStrategy::Serialized => {
                let _guard = self.locks.lock(&pair_key(WISHLIST, uid, &product.id)).await;

                if self.find(uid, &product.id).await?.is_some() {
                    return Ok(WishlistAddOutcome::AlreadyExists);
                }

                self.gateway
                    .execute(RestRequest::post(WISHLIST, row).prefer(Prefer::ReturnMinimal))
                    .await?;
                Ok(WishlistAddOutcome::Added)
            }
        }
    }

    async fn find(&self, uid: &str, product_id: &str) -> DataResult<Option<WishlistItem>> {
        let value = self
            .gateway
            .execute(RestRequest::get(WISHLIST).query(Self::pair(uid, product_id).limit(1)))
            .await?;
        decode_first(value)
    }

    /// Removes a product from the wishlist. Unconditional.
    pub async fn remove(&self, uid: &str, product_id: &str) -> DataResult<()> {
        self.gateway
            .execute(RestRequest::delete(WISHLIST).query(Self::pair(uid, product_id)))
            .await?;
        Ok(())
    }

    async fn fetch_items(&self, uid: &str) -> DataResult<Vec<WishlistItem>> {
        let value = self
            .gateway
            .execute(
                RestRequest::get(WISHLIST).query(
                    Query::new()
                        .select("*")
                        .eq("uid", uid)
                        .order("created_at", Direction::Desc),
                ),
            )
            .await?;
        decode_rows(value)
    }

    /// Saved products, most recent first.
    pub async fn items(&self, uid: &str) -> Fetched<Vec<WishlistItem>> {
        Fetched::from_result(self.fetch_items(uid).await, "wishlist items")
    }

    /// Whether the product is on the user's wishlist.
    pub async fn contains(&self, uid: &str, product_id: &str) -> Fetched<bool> {
        let result = self.find(uid, product_id).await.map(|row| row.is_some());
        Fetched::from_result(result, "wishlist membership")
    }
}
