//! # Order Placement
//!
//! Placing an order is three writes against a backend with no cross-table
//! transaction. They run as a saga: the order insert is the commit point,
//! everything after it is best effort, and stock decrements that fail are
//! persisted for the reconciler instead of being dropped.
//!
//! ## Saga Steps
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  0. validate   items present, customer fields, COD window               │
//! │        │                                                                │
//! │  1. number     MC-<year>-<6 digits>                                     │
//! │        │                                                                │
//! │  2. insert     orders  ── fails ──► StoreError::order_failed()          │
//! │        │  (commit point: the order exists from here on)                 │
//! │        ▼                                                                │
//! │  3. clear      cart of this uid ── fails ──► warn!, continue            │
//! │        │                                                                │
//! │  4. stock      for each line, in order:                                 │
//! │                  read stock ─► write max(0, stock − qty)                │
//! │                      │ fails                                            │
//! │                      ▼                                                  │
//! │                  stock_adjustments.enqueue ── fails ──► error!, lost    │
//! │                                                                         │
//! │  Result: (Order, StockReport { applied, untracked, queued, lost })      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{StoreError, StoreResult};
use storefront_core::money::naira;
use storefront_core::order_number::generate_order_number;
use storefront_core::validation::{
    validate_cod, validate_email, validate_quantity, validate_required, validate_uid,
};
use storefront_core::{
    encode_items, CoreError, Money, Order, OrderLine, OrderStatus, PaymentMethod, PaymentStatus,
    decremented_stock,
};
use storefront_data::{Backend, DataError, NewStockAdjustment};

// =============================================================================
// Request / Response Types
// =============================================================================

/// Who is ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Where the order goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryDetails {
    pub address: String,
    pub city: String,
    pub state: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Everything checkout collected.
///
/// Totals are computed by the checkout page and stored as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub uid: String,
    pub customer: CustomerDetails,
    pub delivery: DeliveryDetails,
    pub items: Vec<OrderLine>,
    #[serde(with = "naira")]
    pub subtotal: Money,
    #[serde(default, with = "naira")]
    pub delivery_fee: Money,
    #[serde(with = "naira")]
    pub total: Money,
    pub payment_method: PaymentMethod,
    /// Present once the payment popup reported success.
    #[serde(default)]
    pub payment_reference: Option<String>,
}

/// What happened to the stock decrements of one order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReport {
    /// Decrements written during checkout.
    pub applied: usize,
    /// Lines whose product does not track stock, or no longer exists.
    pub untracked: usize,
    /// Decrements handed to the reconciler.
    pub queued: usize,
    /// Decrements that could neither be applied nor queued.
    pub lost: usize,
}

impl StockReport {
    /// True when every tracked line was decremented during checkout.
    pub fn is_complete(&self) -> bool {
        self.queued == 0 && self.lost == 0
    }
}

/// A placed order and the state of its stock decrements.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub stock: StockReport,
}

// =============================================================================
// Checkout
// =============================================================================

/// Runs the order placement saga.
#[derive(Clone)]
pub struct Checkout {
    backend: Backend,
}

enum StockOutcome {
    Applied,
    Untracked,
    Failed(String),
}

impl Checkout {
    pub fn new(backend: Backend) -> Self {
        Checkout { backend }
    }

    /// Checks the payment choice against the order total.
    ///
    /// Card payments accept any total; cash on delivery only inside the
    /// COD window.
    pub fn validate_payment_choice(method: PaymentMethod, total: Money) -> StoreResult<()> {
        match method {
            PaymentMethod::Paystack => Ok(()),
            PaymentMethod::CashOnDelivery => Ok(validate_cod(total)?),
        }
    }

    fn validate(request: &OrderRequest) -> StoreResult<()> {
        validate_uid(&request.uid)?;
        if request.items.is_empty() {
            return Err(CoreError::EmptyOrder.into());
        }
        for line in &request.items {
            validate_required("product_id", &line.product_id)?;
            validate_quantity(line.quantity)?;
        }
        validate_required("name", &request.customer.name)?;
        validate_email(&request.customer.email)?;
        validate_required("phone", &request.customer.phone)?;
        validate_required("address", &request.delivery.address)?;
        validate_required("city", &request.delivery.city)?;
        validate_required("state", &request.delivery.state)?;
        Self::validate_payment_choice(request.payment_method, request.total)
    }

    /// Places an order.
    ///
    /// Fails only when validation fails or the order row cannot be written.
    /// Once the row exists the call succeeds, whatever happens to the cart
    /// and the stock levels.
    pub async fn place_order(&self, request: OrderRequest) -> StoreResult<PlacedOrder> {
        Self::validate(&request)?;

        let order_number = generate_order_number(Utc::now().year(), &mut rand::thread_rng());
        let items = encode_items(&request.items)?;
        let payment_status = PaymentStatus::for_reference(request.payment_reference.as_deref());

        debug!(
            uid = %request.uid,
            order_number = %order_number,
            lines = request.items.len(),
            method = %request.payment_method,
            "Placing order"
        );

        let order = Order {
            id: None,
            order_number,
            uid: request.uid.clone(),
            customer_name: request.customer.name,
            customer_email: request.customer.email,
            customer_phone: request.customer.phone,
            items,
            address: request.delivery.address,
            city: request.delivery.city,
            state: request.delivery.state,
            notes: request.delivery.notes,
            payment_method: request.payment_method,
            payment_reference: request.payment_reference,
            payment_status,
            status: OrderStatus::Processing,
            subtotal: request.subtotal,
            delivery_fee: request.delivery_fee,
            total: request.total,
            created_at: None,
            updated_at: None,
        };

        let order = match self.backend.orders().insert(&order).await {
            Ok(stored) => stored,
            Err(e) => {
                error!(
                    uid = %request.uid,
                    order_number = %order.order_number,
                    error = %e,
                    "Order insert failed"
                );
                return Err(StoreError::order_failed());
            }
        };

        if !self.backend.cart().clear(&request.uid).await {
            warn!(uid = %request.uid, order_number = %order.order_number, "Cart left behind after order");
        }

        let stock = self.adjust_stock(&order, &request.items).await;

        info!(
            order_number = %order.order_number,
            total = %order.total,
            applied = stock.applied,
            queued = stock.queued,
            lost = stock.lost,
            "Order placed"
        );

        Ok(PlacedOrder { order, stock })
    }

    /// Step 4: one decrement per line, awaited in order.
    async fn adjust_stock(&self, order: &Order, lines: &[OrderLine]) -> StockReport {
        let mut report = StockReport::default();

        for line in lines {
            match self.decrement(line).await {
                StockOutcome::Applied => report.applied += 1,
                StockOutcome::Untracked => report.untracked += 1,
                StockOutcome::Failed(reason) => {
                    warn!(
                        order_number = %order.order_number,
                        product_id = %line.product_id,
                        error = %reason,
                        "Stock decrement failed, queueing for reconciliation"
                    );
                    let queued = self
                        .backend
                        .stock_adjustments()
                        .enqueue(NewStockAdjustment {
                            order_id: order.id.clone(),
                            order_number: order.order_number.clone(),
                            product_id: line.product_id.clone(),
                            quantity: line.quantity,
                            reason: Some(reason),
                        })
                        .await;

                    match queued {
                        Ok(_) => report.queued += 1,
                        Err(e) => {
                            error!(
                                order_number = %order.order_number,
                                product_id = %line.product_id,
                                quantity = line.quantity,
                                error = %e,
                                "Stock adjustment lost"
                            );
                            report.lost += 1;
                        }
                    }
                }
            }
        }

        report
    }

    async fn decrement(&self, line: &OrderLine) -> StockOutcome {
        let products = self.backend.products();

        let stock = match products.get_stock(&line.product_id).await {
            Ok(Some(stock)) => stock,
            Ok(None) => return StockOutcome::Untracked,
            Err(DataError::NotFound { .. }) => {
                warn!(product_id = %line.product_id, "Ordered product no longer exists");
                return StockOutcome::Untracked;
            }
            Err(e) => return StockOutcome::Failed(e.to_string()),
        };

        let remaining = decremented_stock(stock, line.quantity);
        match products.set_stock(&line.product_id, remaining).await {
            Ok(()) => {
                debug!(product_id = %line.product_id, from = stock, to = remaining, "Stock decremented");
                StockOutcome::Applied
            }
            Err(e) => StockOutcome::Failed(e.to_string()),
        }
    }
}
