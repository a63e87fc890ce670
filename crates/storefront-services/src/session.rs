//! # Session Store
//!
//! Local mirror of the identity provider's session. Pages read it to decide
//! whether to render or redirect to sign-in; nothing here issues identities.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use storefront_core::validation::validate_uid;
use storefront_core::UserProfile;
use storefront_data::UserRepository;

/// The signed-in user, as the identity provider reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl From<UserProfile> for Session {
    fn from(profile: UserProfile) -> Self {
        Session {
            uid: profile.uid,
            email: profile.email,
            display_name: profile.display_name,
        }
    }
}

/// Holds the current session.
#[derive(Clone)]
pub struct SessionStore {
    current: Arc<RwLock<Option<Session>>>,
    users: UserRepository,
}

impl SessionStore {
    pub fn new(users: UserRepository) -> Self {
        SessionStore {
            current: Arc::new(RwLock::new(None)),
            users,
        }
    }

    /// Records a session from the identity provider and mirrors the profile.
    ///
    /// The profile write is best effort; the session is kept either way.
    pub async fn sign_in(&self, session: Session) -> StoreResult<Session> {
        validate_uid(&session.uid)?;

        let profile = UserProfile {
            uid: session.uid.clone(),
            email: session.email.clone(),
            display_name: session.display_name.clone(),
            phone: None,
            created_at: None,
        };
        if let Err(e) = self.users.upsert_profile(&profile).await {
            warn!(uid = %session.uid, error = %e, "Profile mirror failed");
        }

        *self.current.write().await = Some(session.clone());
        info!(uid = %session.uid, "Signed in");
        Ok(session)
    }

    /// Signs in the user registered with `phone`.
    ///
    /// ## Errors
    /// - `VALIDATION_ERROR` for a malformed number
    /// - `NOT_FOUND` when no profile uses it
    pub async fn sign_in_with_phone(&self, phone: &str) -> StoreResult<Session> {
        let profile = self.users.find_by_phone(phone).await?;
        let session = Session::from(profile);

        *self.current.write().await = Some(session.clone());
        info!(uid = %session.uid, "Signed in by phone");
        Ok(session)
    }

    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    /// The signed-in uid, for pages that need one.
    pub async fn require_uid(&self) -> StoreResult<String> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|s| s.uid.clone())
            .ok_or_else(StoreError::unauthenticated)
    }

    pub async fn sign_out(&self) {
        if let Some(session) = self.current.write().await.take() {
            debug!(uid = %session.uid, "Signed out");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;
    use storefront_data::testing::MemoryGateway;
    use storefront_data::{Backend, Method};

    fn store() -> (SessionStore, Arc<MemoryGateway>) {
        let gateway = Arc::new(MemoryGateway::new());
        let backend = Backend::new(gateway.clone());
        (SessionStore::new(backend.users()), gateway)
    }

    #[tokio::test]
    async fn test_page_guard() {
        let (store, _) = store();
        assert_eq!(store.require_uid().await.unwrap_err().code, ErrorCode::Unauthenticated);

        store
            .sign_in(Session {
                uid: "u1".into(),
                email: Some("ada@example.com".into()),
                display_name: Some("Ada".into()),
            })
            .await
            .unwrap();
        assert_eq!(store.require_uid().await.unwrap(), "u1");

        store.sign_out().await;
        assert!(store.current().await.is_none());
    }

    #[tokio::test]
    async fn test_sign_in_survives_profile_failure() {
        let (store, gateway) = store();
        gateway.fail("users", Method::Post, 503);

        let session = store
            .sign_in(Session {
                uid: "u2".into(),
                email: None,
                display_name: None,
            })
            .await
            .unwrap();
        assert_eq!(store.current().await, Some(session));
    }

    #[tokio::test]
    async fn test_phone_sign_in() {
        let (store, gateway) = store();
        gateway.seed(
            "users",
            vec![json!({"uid": "u3", "email": "bola@example.com", "display_name": "Bola", "phone": "08031234567"})],
        );

        let session = store.sign_in_with_phone("0803 123 4567").await.unwrap();
        assert_eq!(session.uid, "u3");
        assert_eq!(session.display_name.as_deref(), Some("Bola"));

        let err = store.sign_in_with_phone("08099999999").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[test]
    fn test_session_wire_shape() {
        let session: Session =
            serde_json::from_value(json!({"uid": "u", "email": null, "displayName": "Chi"})).unwrap();
        assert_eq!(session.display_name.as_deref(), Some("Chi"));
    }
}
