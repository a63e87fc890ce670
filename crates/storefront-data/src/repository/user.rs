//! # User Repository
//!
//! Profile rows mirrored from the identity provider. The phone lookup backs
//! phone-number sign in.

use std::sync::Arc;
use tracing::debug;

use crate::error::{DataError, DataResult};
use crate::gateway::{decode_first, Prefer, RestGateway, RestRequest};
use crate::query::Query;
use crate::read::Fetched;
use crate::repository::USERS;
use storefront_core::validation::{normalize_phone, validate_phone};
use storefront_core::UserProfile;

/// Repository for the `users` table.
#[derive(Clone)]
pub struct UserRepository {
    gateway: Arc<dyn RestGateway>,
}

impl UserRepository {
    pub fn new(gateway: Arc<dyn RestGateway>) -> Self {
        UserRepository { gateway }
    }

    /// Finds the profile registered with a phone number.
    ///
    /// ## Errors
    /// - `Validation` if the number is malformed
    /// - `NotFound` if no profile uses it
    pub async fn find_by_phone(&self, phone: &str) -> DataResult<UserProfile> {
        validate_phone(phone)?;
        let phone = normalize_phone(phone);
        debug!(phone = %phone, "Looking up user by phone");

        let value = self
            .gateway
            .execute(RestRequest::get(USERS).query(Query::new().select("*").eq("phone", &phone).limit(1)))
            .await?;

        decode_first(value)?.ok_or_else(|| DataError::not_found("User", phone))
    }

    async fn fetch(&self, uid: &str) -> DataResult<Option<UserProfile>> {
        let value = self
            .gateway
            .execute(RestRequest::get(USERS).query(Query::new().select("*").eq("uid", uid).limit(1)))
            .await?;
        decode_first(value)
    }

    pub async fn get(&self, uid: &str) -> Fetched<Option<UserProfile>> {
        Fetched::from_result(self.fetch(uid).await, "user profile")
    }

    /// Creates the profile or merges into the existing one.
    pub async fn upsert_profile(&self, profile: &UserProfile) -> DataResult<()> {
        let mut profile = profile.clone();
        profile.phone = profile.phone.as_deref().map(normalize_phone);

        self.gateway
            .execute(
                RestRequest::post(USERS, serde_json::to_value(&profile)?)
                    .query(Query::new().on_conflict(&["uid"]))
                    .prefer(Prefer::MergeDuplicates)
                    .prefer(Prefer::ReturnMinimal),
            )
            .await?;
        Ok(())
    }
}
