//! # Product Repository
//!
//! Reads products and writes stock levels.
//!
//! Every product leaves this module in canonical shape: rows are decoded as
//! [`RawProduct`] and passed through the normalizer, so callers always see a
//! resolved `name`, `image_url` and `display_price`.

use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::error::{DataError, DataResult};
use crate::gateway::{decode_first, decode_rows, Prefer, RestGateway, RestRequest};
use crate::query::{Direction, Query};
use crate::read::Fetched;
use crate::repository::PRODUCTS;
use storefront_core::{normalize_product, Product, RawProduct};

/// Repository for the `products` table.
#[derive(Clone)]
pub struct ProductRepository {
    gateway: Arc<dyn RestGateway>,
}

impl ProductRepository {
    pub fn new(gateway: Arc<dyn RestGateway>) -> Self {
        ProductRepository { gateway }
    }

    async fn fetch(&self, query: Query) -> DataResult<Vec<Product>> {
        let value = self
            .gateway
            .execute(RestRequest::get(PRODUCTS).query(query))
            .await?;
        let raw: Vec<RawProduct> = decode_rows(value)?;
        Ok(raw
            .into_iter()
            .filter_map(|p| normalize_product(Some(p)))
            .collect())
    }

    /// Active products, newest first.
    pub async fn list_active(&self, limit: u32) -> Fetched<Vec<Product>> {
        let query = Query::new()
            .select("*")
            .eq("is_active", true)
            .order("created_at", Direction::Desc)
            .limit(limit);
        Fetched::from_result(self.fetch(query).await, "active products")
    }

    /// A single product by id. `None` when no such row exists.
    pub async fn get(&self, id: &str) -> Fetched<Option<Product>> {
        let query = Query::new().select("*").eq("id", id).limit(1);
        let result = self.fetch(query).await.map(|rows| rows.into_iter().next());
        Fetched::from_result(result, "product")
    }

    /// Case-insensitive substring search on the product name.
    ///
    /// A blank term lists active products instead.
    pub async fn search(&self, term: &str, limit: u32) -> Fetched<Vec<Product>> {
        let term = term.trim();
        debug!(term = %term, limit, "Searching products");

        if term.is_empty() {
            return self.list_active(limit).await;
        }

        let query = Query::new()
            .select("*")
            .ilike("name", term)
            .eq("is_active", true)
            .limit(limit);
        Fetched::from_result(self.fetch(query).await, "product search")
    }

    /// Active products in one category.
    pub async fn by_category(&self, category: &str, limit: u32) -> Fetched<Vec<Product>> {
        let query = Query::new()
            .select("*")
            .eq("category", category)
            .eq("is_active", true)
            .order("created_at", Direction::Desc)
            .limit(limit);
        Fetched::from_result(self.fetch(query).await, "category products")
    }

    /// Current stock of a product.
    ///
    /// ## Returns
    /// * `Ok(Some(n))` - tracked stock level
    /// * `Ok(None)` - the product does not track stock
    /// * `Err(NotFound)` - no such product
    pub async fn get_stock(&self, id: &str) -> DataResult<Option<i64>> {
        #[derive(serde::Deserialize)]
        struct StockRow {
            #[serde(default)]
            stock: Option<i64>,
        }

        let value = self
            .gateway
            .execute(
                RestRequest::get(PRODUCTS).query(Query::new().select("id,stock").eq("id", id).limit(1)),
            )
            .await?;

        let row: Option<StockRow> = decode_first(value)?;
        row.map(|r| r.stock)
            .ok_or_else(|| DataError::not_found("Product", id))
    }

    /// Overwrites a product's stock level.
    pub async fn set_stock(&self, id: &str, stock: i64) -> DataResult<()> {
        debug!(product_id = %id, stock, "Writing stock level");
        self.gateway
            .execute(
                RestRequest::patch(PRODUCTS, json!({ "stock": stock }))
                    .query(Query::new().eq("id", id))
                    .prefer(Prefer::ReturnMinimal),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryGateway;
    use crate::gateway::Method;
    use serde_json::json;
    use storefront_core::Money;

    fn repo() -> (Arc<MemoryGateway>, ProductRepository) {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.seed(
            PRODUCTS,
            vec![
                json!({"id": "p1", "title": "Ankara Tote", "price": 12000, "promo_price": 9000,
                       "stock": 5, "category": "bags", "is_active": true,
                       "created_at": "2026-01-01T00:00:00Z"}),
                json!({"id": "p2", "name": "Leather Sandals", "price": 15000, "stock": 2,
                       "category": "shoes", "is_active": true,
                       "created_at": "2026-02-01T00:00:00Z"}),
                json!({"id": "p3", "name": "Old Stock Bag", "price": 3000,
                       "category": "bags", "is_active": false,
                       "created_at": "2026-03-01T00:00:00Z"}),
            ],
        );
        (gateway.clone(), ProductRepository::new(gateway))
    }

    #[tokio::test]
    async fn test_list_active_normalizes_and_orders() {
        let (_, repo) = repo();
        let products = repo.list_active(10).await.into_value();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].id, "p2");
        assert_eq!(products[1].name, "Ankara Tote");
        assert_eq!(products[1].display_price, Money::from_naira(9_000));
        assert_eq!(products[1].original_price, Some(Money::from_naira(12_000)));
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let (_, repo) = repo();
        let found = repo.search("SANDAL", 10).await;
        assert!(!found.is_degraded());
        assert_eq!(found.into_value().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_read_degrades_to_empty() {
        let (gateway, repo) = repo();
        gateway.fail(PRODUCTS, Method::Get, 503);

        let products = repo.by_category("bags", 10).await;
        assert!(products.is_degraded());
        assert!(products.value().is_empty());

        let product = repo.get("p1").await;
        assert!(product.is_degraded());
        assert_eq!(product.into_value(), None);
    }

    #[tokio::test]
    async fn test_stock_round_trip() {
        let (_, repo) = repo();
        assert_eq!(repo.get_stock("p1").await.unwrap(), Some(5));
        repo.set_stock("p1", 4).await.unwrap();
        assert_eq!(repo.get_stock("p1").await.unwrap(), Some(4));
        assert_eq!(repo.get_stock("p3").await.unwrap(), None);
        assert!(matches!(
            repo.get_stock("missing").await,
            Err(DataError::NotFound { .. })
        ));
    }
}
