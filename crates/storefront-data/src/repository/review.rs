//! # Review Repository
//!
//! Reviews are append-only. A user may review the same product more than
//! once; nothing here deduplicates.

use std::sync::Arc;

use crate::error::{DataError, DataResult};
use crate::gateway::{decode_first, decode_rows, Prefer, RestGateway, RestRequest};
use crate::query::{Direction, Query};
use crate::read::Fetched;
use crate::repository::REVIEWS;
use storefront_core::validation::{validate_comment, validate_rating, validate_required};
use storefront_core::{Review, ReviewSummary};

/// Repository for the `reviews` table.
#[derive(Clone)]
pub struct ReviewRepository {
    gateway: Arc<dyn RestGateway>,
}

impl ReviewRepository {
    pub fn new(gateway: Arc<dyn RestGateway>) -> Self {
        ReviewRepository { gateway }
    }

    async fn fetch(&self, product_id: &str) -> DataResult<Vec<Review>> {
        let value = self
            .gateway
            .execute(
                RestRequest::get(REVIEWS).query(
                    Query::new()
                        .select("*")
                        .eq("product_id", product_id)
                        .order("created_at", Direction::Desc),
                ),
            )
            .await?;
        decode_rows(value)
    }

    /// Reviews of a product, newest first.
    pub async fn for_product(&self, product_id: &str) -> Fetched<Vec<Review>> {
        Fetched::from_result(self.fetch(product_id).await, "product reviews")
    }

    /// Stores a review after checking rating, author and comment length.
    pub async fn add(&self, review: &Review) -> DataResult<Review> {
        validate_rating(review.rating)?;
        validate_required("user_name", &review.user_name)?;
        validate_comment(&review.comment)?;

        let value = self
            .gateway
            .execute(
                RestRequest::post(REVIEWS, serde_json::to_value(review)?)
                    .prefer(Prefer::ReturnRepresentation),
            )
            .await?;

        decode_first(value)?
            .ok_or_else(|| DataError::Decode("review insert returned no row".to_string()))
    }

    /// Average rating and review count.
    pub async fn summary(&self, product_id: &str) -> Fetched<ReviewSummary> {
        self.for_product(product_id)
            .await
            .map(|reviews| ReviewSummary::from_reviews(&reviews))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryGateway;

    fn review(uid: &str, rating: i32) -> Review {
        Review {
            id: None,
            uid: uid.to_string(),
            product_id: "p1".to_string(),
            user_name: "Ngozi".to_string(),
            rating,
            comment: "Lovely fabric".to_string(),
            verified: false,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_same_user_may_review_twice() {
        let gateway = Arc::new(MemoryGateway::new());
        let repo = ReviewRepository::new(gateway.clone());

        repo.add(&review("u1", 5)).await.unwrap();
        repo.add(&review("u1", 3)).await.unwrap();

        let summary = repo.summary("p1").await.into_value();
        assert_eq!(summary.count, 2);
        assert!((summary.average - 4.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_rating_out_of_range_rejected() {
        let gateway = Arc::new(MemoryGateway::new());
        let repo = ReviewRepository::new(gateway.clone());

        let err = repo.add(&review("u1", 6)).await.unwrap_err();
        assert!(matches!(err, DataError::Validation(_)));
        assert_eq!(gateway.request_count(), 0);
    }
}
