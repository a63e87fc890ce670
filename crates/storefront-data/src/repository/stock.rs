//! # Stock Adjustment Repository
//!
//! Persisted queue of stock decrements that checkout could not apply.
//!
//! ## Queue Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Stock Adjustment Queue                                 │
//! │                                                                         │
//! │  Checkout: stock write for one line fails                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  enqueue() ──► stock_adjustments (applied_at IS NULL)                   │
//! │                       │                                                 │
//! │                       ▼                                                 │
//! │  StockReconciler polls pending(limit, max_attempts), oldest first       │
//! │       │                                                                 │
//! │       ├── success ──► mark_applied()  (applied_at = now)                │
//! │       └── failure ──► mark_failed()   (attempts + 1, last_error)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DataError, DataResult};
use crate::gateway::{decode_first, decode_rows, Prefer, RestGateway, RestRequest};
use crate::query::{Direction, Query};
use crate::read::Fetched;
use crate::repository::STOCK_ADJUSTMENTS;
use storefront_core::StockAdjustment;

/// A stock decrement to queue.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStockAdjustment {
    pub order_id: Option<String>,
    pub order_number: String,
    pub product_id: String,
    pub quantity: i64,
    /// The failure that caused the adjustment to be queued.
    pub reason: Option<String>,
}

/// Repository for the `stock_adjustments` table.
#[derive(Clone)]
pub struct StockAdjustmentRepository {
    gateway: Arc<dyn RestGateway>,
}

impl StockAdjustmentRepository {
    pub fn new(gateway: Arc<dyn RestGateway>) -> Self {
        StockAdjustmentRepository { gateway }
    }

    /// Queues an adjustment for the reconciler.
    pub async fn enqueue(&self, adjustment: NewStockAdjustment) -> DataResult<StockAdjustment> {
        let entry = StockAdjustment {
            id: Uuid::new_v4().to_string(),
            order_id: adjustment.order_id,
            order_number: adjustment.order_number,
            product_id: adjustment.product_id,
            quantity: adjustment.quantity,
            attempts: 0,
            last_error: adjustment.reason,
            created_at: Utc::now(),
            attempted_at: None,
            applied_at: None,
        };

        let value = self
            .gateway
            .execute(
                RestRequest::post(STOCK_ADJUSTMENTS, serde_json::to_value(&entry)?)
                    .prefer(Prefer::ReturnRepresentation),
            )
            .await?;

        let stored: StockAdjustment = decode_first(value)?
            .ok_or_else(|| DataError::Decode("stock adjustment insert returned no row".to_string()))?;

        info!(
            id = %stored.id,
            order_number = %stored.order_number,
            product_id = %stored.product_id,
            quantity = stored.quantity,
            "Stock adjustment queued"
        );
        Ok(stored)
    }

    /// Unapplied adjustments with attempts left, oldest first.
    ///
    /// Rows at `max_attempts` are left out so they cannot fill the batch.
    pub async fn pending(&self, limit: u32, max_attempts: i64) -> DataResult<Vec<StockAdjustment>> {
        let value = self
            .gateway
            .execute(
                RestRequest::get(STOCK_ADJUSTMENTS).query(
                    Query::new()
                        .select("*")
                        .is_null("applied_at")
                        .lt("attempts", max_attempts)
                        .order("created_at", Direction::Asc)
                        .limit(limit),
                ),
            )
            .await?;
        decode_rows(value)
    }

    /// Unapplied adjustments that have used up their attempts.
    pub async fn count_exhausted(&self, max_attempts: i64) -> DataResult<usize> {
        let value = self
            .gateway
            .execute(
                RestRequest::get(STOCK_ADJUSTMENTS).query(
                    Query::new()
                        .select("id")
                        .is_null("applied_at")
                        .gte("attempts", max_attempts),
                ),
            )
            .await?;
        let ids: Vec<serde_json::Value> = decode_rows(value)?;
        Ok(ids.len())
    }

    pub async fn mark_applied(&self, id: &str) -> DataResult<()> {
        let now = Utc::now();
        self.gateway
            .execute(
                RestRequest::patch(
                    STOCK_ADJUSTMENTS,
                    json!({ "applied_at": now, "attempted_at": now }),
                )
                .query(Query::new().eq("id", id))
                .prefer(Prefer::ReturnMinimal),
            )
            .await?;
        debug!(id = %id, "Stock adjustment applied");
        Ok(())
    }

    /// Records a failed attempt.
    pub async fn mark_failed(&self, adjustment: &StockAdjustment, error: &str) -> DataResult<()> {
        self.gateway
            .execute(
                RestRequest::patch(
                    STOCK_ADJUSTMENTS,
                    json!({
                        "attempts": adjustment.attempts + 1,
                        "last_error": error,
                        "attempted_at": Utc::now(),
                    }),
                )
                .query(Query::new().eq("id", &adjustment.id))
                .prefer(Prefer::ReturnMinimal),
            )
            .await?;
        Ok(())
    }

    /// Number of unapplied adjustments.
    pub async fn count_pending(&self) -> Fetched<usize> {
        Fetched::from_result(self.fetch_pending_ids().await.map(|ids| ids.len()), "pending stock adjustments")
    }

    async fn fetch_pending_ids(&self) -> DataResult<Vec<serde_json::Value>> {
        let value = self
            .gateway
            .execute(
                RestRequest::get(STOCK_ADJUSTMENTS)
                    .query(Query::new().select("id").is_null("applied_at")),
            )
            .await?;
        decode_rows(value)
    }
}
