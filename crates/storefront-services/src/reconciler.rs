//! # Stock Reconciler
//!
//! Drains the `stock_adjustments` queue that checkout fills when a stock
//! decrement fails.
//!
//! ## Reconcile Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Reconciler Flow                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  stock_adjustments Table                        │   │
//! │  │                                                                 │   │
//! │  │  id  | order_number   | product_id | quantity | attempts | applied_at │
//! │  │  ────┼────────────────┼────────────┼──────────┼──────────┼───────────│
//! │  │  a1  │ MC-2026-481516 │ p-17       │ 2        │ 0        │ NULL      │
//! │  │  a2  │ MC-2026-234200 │ p-03       │ 1        │ 3        │ NULL      │
//! │  └────────────────────────────┬────────────────────────────────────┘   │
//! │                               │                                         │
//! │                               ▼                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    StockReconciler                              │   │
//! │  │                                                                 │   │
//! │  │  1. Poll:  applied_at IS NULL AND attempts < max_attempts       │   │
//! │  │            ORDER BY created_at LIMIT batch                      │   │
//! │  │  2. Count: attempts >= max_attempts (left for an operator)      │   │
//! │  │  3. Apply: stock := max(0, stock − quantity)                    │   │
//! │  │  4. Mark:  applied_at = now                                     │   │
//! │  │     or     attempts += 1, last_error                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  TIMING:                                                               │
//! │  • Poll interval: 30 seconds (configurable)                            │
//! │  • After a stalled poll: exponential backoff, 500ms doubling to 5min   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Delivery is at least once. An adjustment whose stock write lands but
//! whose `applied_at` write fails is applied again on the next poll.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::ReconcilerSettings;
use crate::error::{StoreError, StoreResult};
use storefront_core::{decremented_stock, StockAdjustment};
use storefront_data::{Backend, DataError, DataResult};

// =============================================================================
// Summary
// =============================================================================

/// Outcome of one poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    /// Stock written and adjustment marked applied.
    pub applied: usize,
    /// Product gone or untracked; adjustment closed without a write.
    pub discarded: usize,
    /// Attempt failed; attempts incremented.
    pub failed: usize,
    /// Past `max_attempts`; counted, never fetched.
    pub skipped: usize,
}

impl ReconcileSummary {
    /// Every attempted adjustment failed.
    pub fn is_stalled(&self) -> bool {
        self.failed > 0 && self.applied == 0 && self.discarded == 0
    }
}

enum Applied {
    Written,
    Discarded,
}

// =============================================================================
// Reconciler
// =============================================================================

/// Background worker applying queued stock adjustments.
pub struct StockReconciler {
    backend: Backend,
    settings: ReconcilerSettings,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for stopping a running reconciler.
#[derive(Clone)]
pub struct StockReconcilerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl StockReconcilerHandle {
    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) -> StoreResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| StoreError::internal("Reconciler already stopped"))
    }
}

impl StockReconciler {
    /// Creates a reconciler and its handle.
    pub fn new(backend: Backend, settings: ReconcilerSettings) -> (Self, StockReconcilerHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        (
            StockReconciler {
                backend,
                settings,
                shutdown_rx,
            },
            StockReconcilerHandle { shutdown_tx },
        )
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_millis(self.settings.initial_backoff_ms),
            max_interval: Duration::from_secs(self.settings.max_backoff_secs),
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    /// Runs until the handle asks it to stop.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!(
            poll_interval_secs = self.settings.poll_interval_secs,
            batch_size = self.settings.batch_size,
            "Stock reconciler starting"
        );

        let mut interval = tokio::time::interval(Duration::from_secs(self.settings.poll_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut backoff = self.create_backoff();

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let stalled = match self.reconcile_once().await {
                        Ok(summary) => summary.is_stalled(),
                        Err(e) => {
                            error!(error = %e, "Failed to read stock adjustment queue");
                            true
                        }
                    };

                    if !stalled {
                        backoff.reset();
                        continue;
                    }

                    if let Some(delay) = backoff.next_backoff() {
                        debug!(?delay, "Backing off before next poll");
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = self.shutdown_rx.recv() => {
                                info!("Shutdown during backoff");
                                break;
                            }
                        }
                        interval.reset();
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Stock reconciler shutting down");
                    break;
                }
            }
        }

        info!("Stock reconciler stopped");
    }

    /// Processes one batch of pending adjustments.
    ///
    /// Fails only when the queue itself cannot be read.
    pub async fn reconcile_once(&self) -> DataResult<ReconcileSummary> {
        let queue = self.backend.stock_adjustments();
        let max_attempts = self.settings.max_attempts;
        let pending = queue.pending(self.settings.batch_size, max_attempts).await?;

        let mut summary = ReconcileSummary::default();
        match queue.count_exhausted(max_attempts).await {
            Ok(0) => {}
            Ok(n) => {
                warn!(count = n, max_attempts, "Stock adjustments past max attempts need an operator");
                summary.skipped = n;
            }
            Err(e) => warn!(error = %e, "Could not count exhausted stock adjustments"),
        }

        if pending.is_empty() {
            debug!("No pending stock adjustments");
            return Ok(summary);
        }

        for adjustment in pending {
            match self.apply(&adjustment).await {
                Ok(outcome) => {
                    if let Err(e) = queue.mark_applied(&adjustment.id).await {
                        // Stock is written; the next poll applies it again.
                        error!(id = %adjustment.id, error = %e, "Could not close stock adjustment");
                    }
                    match outcome {
                        Applied::Written => summary.applied += 1,
                        Applied::Discarded => summary.discarded += 1,
                    }
                }
                Err(e) => {
                    warn!(
                        id = %adjustment.id,
                        product_id = %adjustment.product_id,
                        attempts = adjustment.attempts + 1,
                        error = %e,
                        "Stock adjustment failed"
                    );
                    if let Err(mark) = queue.mark_failed(&adjustment, &e.to_string()).await {
                        error!(id = %adjustment.id, error = %mark, "Could not record failed attempt");
                    }
                    summary.failed += 1;
                }
            }
        }

        info!(
            applied = summary.applied,
            discarded = summary.discarded,
            failed = summary.failed,
            skipped = summary.skipped,
            "Stock reconcile pass complete"
        );
        Ok(summary)
    }

    async fn apply(&self, adjustment: &StockAdjustment) -> DataResult<Applied> {
        let products = self.backend.products();

        let stock = match products.get_stock(&adjustment.product_id).await {
            Ok(Some(stock)) => stock,
            Ok(None) => return Ok(Applied::Discarded),
            Err(DataError::NotFound { .. }) => {
                warn!(product_id = %adjustment.product_id, "Product gone, discarding stock adjustment");
                return Ok(Applied::Discarded);
            }
            Err(e) => return Err(e),
        };

        let remaining = decremented_stock(stock, adjustment.quantity);
        products.set_stock(&adjustment.product_id, remaining).await?;

        debug!(
            id = %adjustment.id,
            product_id = %adjustment.product_id,
            from = stock,
            to = remaining,
            "Stock adjustment applied"
        );
        Ok(Applied::Written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use storefront_data::testing::MemoryGateway;
    use storefront_data::{Method, NewStockAdjustment};

    fn setup() -> (Backend, Arc<MemoryGateway>) {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.seed(
            "products",
            vec![
                json!({"id": "p1", "name": "Shea Butter", "price": 3000, "stock": 5}),
                json!({"id": "p2", "name": "Zobo Mix", "price": 1500, "stock": null}),
            ],
        );
        (Backend::new(gateway.clone()), gateway)
    }

    async fn enqueue(backend: &Backend, product_id: &str, quantity: i64) {
        backend
            .stock_adjustments()
            .enqueue(NewStockAdjustment {
                order_id: None,
                order_number: "MC-2026-100200".into(),
                product_id: product_id.into(),
                quantity,
                reason: Some("backend returned 503".into()),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_applies_and_closes() {
        let (backend, gateway) = setup();
        enqueue(&backend, "p1", 2).await;
        enqueue(&backend, "p2", 1).await;
        enqueue(&backend, "p-gone", 1).await;

        let (reconciler, _handle) = StockReconciler::new(backend.clone(), ReconcilerSettings::default());
        let summary = reconciler.reconcile_once().await.unwrap();

        assert_eq!(summary.applied, 1);
        assert_eq!(summary.discarded, 2);
        assert_eq!(gateway.find("products", "id", "p1").unwrap()["stock"], 3);
        assert_eq!(backend.stock_adjustments().count_pending().await.into_value(), 0);
    }

    #[tokio::test]
    async fn test_failure_counts_attempt_and_skips_at_limit() {
        let (backend, gateway) = setup();
        enqueue(&backend, "p1", 1).await;
        gateway.fail("products", Method::Patch, 503);

        let settings = ReconcilerSettings {
            max_attempts: 2,
            ..Default::default()
        };
        let (reconciler, _handle) = StockReconciler::new(backend.clone(), settings);

        let first = reconciler.reconcile_once().await.unwrap();
        assert_eq!(first.failed, 1);
        assert!(first.is_stalled());

        reconciler.reconcile_once().await.unwrap();
        let third = reconciler.reconcile_once().await.unwrap();
        assert_eq!(third.skipped, 1);
        assert_eq!(third.failed, 0);

        let row = &gateway.rows("stock_adjustments")[0];
        assert_eq!(row["attempts"], 2);
        assert!(row["last_error"].as_str().unwrap().contains("503"));
        assert_eq!(gateway.find("products", "id", "p1").unwrap()["stock"], 5);
    }

    #[tokio::test]
    async fn test_exhausted_adjustment_does_not_block_newer_ones() {
        let (backend, gateway) = setup();
        gateway.seed(
            "products",
            vec![json!({"id": "p3", "name": "Ankara Tote", "price": 6000, "stock": 5})],
        );
        let settings = ReconcilerSettings {
            max_attempts: 1,
            batch_size: 1,
            ..Default::default()
        };
        let (reconciler, _handle) = StockReconciler::new(backend.clone(), settings);

        enqueue(&backend, "p1", 1).await;
        gateway.fail_matching("products", Method::Patch, "id", "p1", 503);
        assert_eq!(reconciler.reconcile_once().await.unwrap().failed, 1);

        enqueue(&backend, "p3", 2).await;
        let summary = reconciler.reconcile_once().await.unwrap();
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(gateway.find("products", "id", "p3").unwrap()["stock"], 3);
        assert_eq!(gateway.find("products", "id", "p1").unwrap()["stock"], 5);
    }

    #[tokio::test]
    async fn test_unreadable_queue_is_an_error() {
        let (backend, gateway) = setup();
        gateway.fail("stock_adjustments", Method::Get, 500);

        let (reconciler, _handle) = StockReconciler::new(backend, ReconcilerSettings::default());
        assert!(reconciler.reconcile_once().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_shutdown() {
        let (backend, gateway) = setup();
        enqueue(&backend, "p1", 4).await;

        let (reconciler, handle) = StockReconciler::new(backend, ReconcilerSettings::default());
        let task = tokio::spawn(reconciler.run());

        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.shutdown().await.unwrap();
        task.await.unwrap();

        assert_eq!(gateway.find("products", "id", "p1").unwrap()["stock"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_polls_once_at_startup() {
        let (backend, gateway) = setup();
        let before = gateway.request_count();

        let (reconciler, handle) = StockReconciler::new(backend, ReconcilerSettings::default());
        let task = tokio::spawn(reconciler.run());

        tokio::time::sleep(Duration::from_secs(1)).await;
        // One pass: the pending read plus the exhausted count
        assert_eq!(gateway.request_count() - before, 2);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }
}
