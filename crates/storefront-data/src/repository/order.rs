//! # Order Repository
//!
//! Inserts and reads orders. Orders are never updated or deleted here;
//! status changes come from an operator tool.

use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{DataError, DataResult};
use crate::gateway::{decode_first, decode_rows, Prefer, RestGateway, RestRequest};
use crate::query::{Direction, Query};
use crate::read::Fetched;
use crate::repository::ORDERS;
use storefront_core::Order;

/// Repository for the `orders` table.
#[derive(Clone)]
pub struct OrderRepository {
    gateway: Arc<dyn RestGateway>,
}

impl OrderRepository {
    pub fn new(gateway: Arc<dyn RestGateway>) -> Self {
        OrderRepository { gateway }
    }

    /// Inserts an order and returns the stored row.
    ///
    /// ## Errors
    /// A duplicate `order_number` comes back as `DataError::Remote` with a
    /// 409 status (see [`DataError::is_conflict`]).
    pub async fn insert(&self, order: &Order) -> DataResult<Order> {
        let value = self
            .gateway
            .execute(
                RestRequest::post(ORDERS, serde_json::to_value(order)?)
                    .prefer(Prefer::ReturnRepresentation),
            )
            .await?;

        let stored: Order = decode_first(value)?
            .ok_or_else(|| DataError::Decode("order insert returned no row".to_string()))?;

        info!(
            order_number = %stored.order_number,
            uid = %stored.uid,
            total = %stored.total,
            "Order inserted"
        );
        Ok(stored)
    }

    async fn fetch(&self, query: Query) -> DataResult<Vec<Order>> {
        let value = self
            .gateway
            .execute(RestRequest::get(ORDERS).query(query))
            .await?;
        decode_rows(value)
    }

    pub async fn get(&self, id: &str) -> Fetched<Option<Order>> {
        let result = self
            .fetch(Query::new().select("*").eq("id", id).limit(1))
            .await
            .map(|rows| rows.into_iter().next());
        Fetched::from_result(result, "order")
    }

    pub async fn by_number(&self, order_number: &str) -> Fetched<Option<Order>> {
        let result = self
            .fetch(Query::new().select("*").eq("order_number", order_number).limit(1))
            .await
            .map(|rows| rows.into_iter().next());
        Fetched::from_result(result, "order by number")
    }

    /// The user's orders, newest first.
    pub async fn for_user(&self, uid: &str) -> Fetched<Vec<Order>> {
        debug!(uid = %uid, "Listing orders");
        let query = Query::new()
            .select("*")
            .eq("uid", uid)
            .order("created_at", Direction::Desc);
        Fetched::from_result(self.fetch(query).await, "user orders")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Method;
    use crate::testing::MemoryGateway;
    use storefront_core::{Money, OrderStatus, PaymentMethod, PaymentStatus};

    fn order(number: &str, uid: &str) -> Order {
        Order {
            id: None,
            order_number: number.to_string(),
            uid: uid.to_string(),
            customer_name: "Chidi Okafor".to_string(),
            customer_email: "chidi@example.com".to_string(),
            customer_phone: "08020000000".to_string(),
            items: "[]".to_string(),
            address: "12 Allen Avenue".to_string(),
            city: "Ikeja".to_string(),
            state: "Lagos".to_string(),
            notes: None,
            payment_method: PaymentMethod::Paystack,
            payment_reference: Some("MC_1_123456".to_string()),
            payment_status: PaymentStatus::Paid,
            status: OrderStatus::Processing,
            subtotal: Money::from_naira(10_000),
            delivery_fee: Money::from_naira(2_000),
            total: Money::from_naira(12_000),
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_insert_returns_stored_row() {
        let gateway = Arc::new(MemoryGateway::new());
        let repo = OrderRepository::new(gateway.clone());

        let stored = repo.insert(&order("MC-2026-100001", "u1")).await.unwrap();
        assert!(stored.id.is_some());
        assert!(stored.created_at.is_some());
        assert_eq!(stored.total, Money::from_naira(12_000));

        let found = repo.by_number("MC-2026-100001").await.into_value();
        assert_eq!(found.map(|o| o.uid), Some("u1".to_string()));
    }

    #[tokio::test]
    async fn test_duplicate_number_is_conflict() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.unique(ORDERS, &["order_number"]);
        let repo = OrderRepository::new(gateway);

        repo.insert(&order("MC-2026-100001", "u1")).await.unwrap();
        let err = repo.insert(&order("MC-2026-100001", "u2")).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_for_user_newest_first() {
        let gateway = Arc::new(MemoryGateway::new());
        let repo = OrderRepository::new(gateway.clone());

        repo.insert(&order("MC-2026-100001", "u1")).await.unwrap();
        repo.insert(&order("MC-2026-100002", "u1")).await.unwrap();
        repo.insert(&order("MC-2026-100003", "u2")).await.unwrap();

        let orders = repo.for_user("u1").await.into_value();
        let numbers: Vec<_> = orders.iter().map(|o| o.order_number.as_str()).collect();
        assert_eq!(numbers, vec!["MC-2026-100002", "MC-2026-100001"]);

        gateway.fail(ORDERS, Method::Get, 500);
        assert!(repo.for_user("u1").await.is_degraded());
    }
}
