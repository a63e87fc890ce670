//! # Cart Repository
//!
//! One row per (uid, product_id); repeated adds accumulate quantity.
//!
//! ## Add Strategies
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Native (default)                                                       │
//! │                                                                         │
//! │  POST rpc/add_to_cart ──► INSERT ... ON CONFLICT (uid, product_id)      │
//! │                           DO UPDATE SET quantity = cart.quantity        │
//! │                                              + EXCLUDED.quantity        │
//! │                           RETURNING quantity, inserted                  │
//! │  One round trip. The backend arbitrates concurrent adds.                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │  Serialized                                                             │
//! │                                                                         │
//! │  lock(cart:uid:product) ──► GET row ──┬── found ──► PATCH quantity + q  │
//! │                                       └── none  ──► POST snapshot       │
//! │  Only safe when this process is the sole writer for the user.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{DataError, DataResult};
use crate::gateway::{decode_first, decode_rows, Prefer, RestGateway, RestRequest};
use crate::locks::{pair_key, KeyedLocks};
use crate::query::{Direction, Query};
use crate::read::Fetched;
use crate::repository::{UpsertStrategy, ADD_TO_CART_RPC, CART};
use storefront_core::money::naira;
use storefront_core::validation::validate_quantity;
use storefront_core::{CartAction, CartAddOutcome, CartItem, Money, Product};

/// Row returned by the `add_to_cart` function.
#[derive(Debug, Deserialize)]
struct UpsertedRow {
    quantity: i64,
    #[serde(default)]
    inserted: bool,
}

/// Repository for the `cart` table.
#[derive(Clone)]
pub struct CartRepository {
    gateway: Arc<dyn RestGateway>,
    strategy: UpsertStrategy,
    locks: KeyedLocks,
}

impl CartRepository {
    pub fn new(gateway: Arc<dyn RestGateway>, strategy: UpsertStrategy, locks: KeyedLocks) -> Self {
        CartRepository {
            gateway,
            strategy,
            locks,
        }
    }

    fn pair(uid: &str, product_id: &str) -> Query {
        Query::new().eq("uid", uid).eq("product_id", product_id)
    }

    /// Adds `quantity` units of a product to the user's cart.
    ///
    /// The line's name, image and unit price are snapshotted from the
    /// product's current display values when the row is first created.
    ///
    /// ## Returns
    /// `Added` with the new quantity, or `Updated` with the accumulated one.
    pub async fn add(&self, uid: &str, product: &Product, quantity: i64) -> DataResult<CartAddOutcome> {
        validate_quantity(quantity)?;

        debug!(
            uid = %uid,
            product_id = %product.id,
            quantity,
            strategy = ?self.strategy,
            "Adding to cart"
        );

        match self.strategy {
            UpsertStrategy::Native => self.add_native(uid, product, quantity).await,
            UpsertStrategy::Serialized => self.add_serialized(uid, product, quantity).await,
        }
    }

    async fn add_native(&self, uid: &str, product: &Product, quantity: i64) -> DataResult<CartAddOutcome> {
        let mut args = json!({
            "p_uid": uid,
            "p_product_id": product.id,
            "p_name": product.name,
            "p_image_url": product.image_url,
            "p_quantity": quantity,
        });
        args["p_price"] = naira::serialize(&product.display_price, serde_json::value::Serializer)?;

        let value = self
            .gateway
            .execute(RestRequest::rpc(ADD_TO_CART_RPC, args))
            .await?;

        let row: UpsertedRow = decode_first(value)?
            .ok_or_else(|| DataError::Decode("add_to_cart returned no row".to_string()))?;

        Ok(CartAddOutcome {
            action: if row.inserted {
                CartAction::Added
            } else {
                CartAction::Updated
            },
            quantity: row.quantity,
        })
    }

    async fn add_serialized(&self, uid: &str, product: &Product, quantity: i64) -> DataResult<CartAddOutcome> {
        let _guard = self.locks.lock(&pair_key(CART, uid, &product.id)).await;

        match self.find(uid, &product.id).await? {
            Some(existing) => {
                let total = existing.quantity + quantity;
                self.gateway
                    .execute(
                        RestRequest::patch(
                            CART,
                            json!({ "quantity": total, "updated_at": Utc::now() }),
                        )
                        .query(Self::pair(uid, &product.id))
                        .prefer(Prefer::ReturnMinimal),
                    )
                    .await?;

                Ok(CartAddOutcome {
                    action: CartAction::Updated,
                    quantity: total,
                })
            }
            None => {
                let line = CartItem::snapshot(uid, product, quantity);
                self.gateway
                    .execute(
                        RestRequest::post(CART, serde_json::to_value(&line)?)
                            .prefer(Prefer::ReturnMinimal),
                    )
                    .await?;

                Ok(CartAddOutcome {
                    action: CartAction::Added,
                    quantity,
                })
            }
        }
    }

    /// The user's row for a product, if any.
    pub async fn find(&self, uid: &str, product_id: &str) -> DataResult<Option<CartItem>> {
        let value = self
            .gateway
            .execute(RestRequest::get(CART).query(Self::pair(uid, product_id).limit(1)))
            .await?;
        decode_first(value)
    }

    /// Sets a line's quantity. Zero or less removes the line.
    pub async fn update_quantity(&self, uid: &str, product_id: &str, quantity: i64) -> DataResult<()> {
        if quantity <= 0 {
            return self.remove(uid, product_id).await;
        }
        validate_quantity(quantity)?;

        self.gateway
            .execute(
                RestRequest::patch(CART, json!({ "quantity": quantity, "updated_at": Utc::now() }))
                    .query(Self::pair(uid, product_id))
                    .prefer(Prefer::ReturnMinimal),
            )
            .await?;
        Ok(())
    }

    /// Removes a line. Removing a line that does not exist is not an error.
    pub async fn remove(&self, uid: &str, product_id: &str) -> DataResult<()> {
        self.gateway
            .execute(RestRequest::delete(CART).query(Self::pair(uid, product_id)))
            .await?;
        Ok(())
    }

    /// Deletes every line of the user's cart.
    ///
    /// Best effort: failures are logged and reported as `false`.
    pub async fn clear(&self, uid: &str) -> bool {
        match self
            .gateway
            .execute(RestRequest::delete(CART).query(Query::new().eq("uid", uid)))
            .await
        {
            Ok(_) => true,
            Err(err) => {
                warn!(uid = %uid, error = %err, "Failed to clear cart");
                false
            }
        }
    }

    async fn fetch_items(&self, uid: &str) -> DataResult<Vec<CartItem>> {
        let value = self
            .gateway
            .execute(
                RestRequest::get(CART).query(
                    Query::new()
                        .select("*")
                        .eq("uid", uid)
                        .order("created_at", Direction::Asc),
                ),
            )
            .await?;
        decode_rows(value)
    }

    /// The user's cart lines, oldest first.
    pub async fn items(&self, uid: &str) -> Fetched<Vec<CartItem>> {
        Fetched::from_result(self.fetch_items(uid).await, "cart items")
    }

    /// Total units in the cart (sum of quantities).
    pub async fn count(&self, uid: &str) -> Fetched<i64> {
        self.items(uid)
            .await
            .map(|items| items.iter().map(|i| i.quantity).sum())
    }

    /// Sum of line totals.
    pub async fn subtotal(&self, uid: &str) -> Fetched<Money> {
        self.items(uid)
            .await
            .map(|items| storefront_core::cart_subtotal(&items))
    }
}
