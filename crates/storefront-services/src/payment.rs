//! # Payment Initiation
//!
//! Card payments go through the provider's popup; cash on delivery is a
//! local range check. The popup SDK is loaded once per process and shared.
//!
//! ## Card Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PaymentInitiator::pay(details, handler)                                │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  sdk() ── OnceCell ── first call only ──► SdkLoader::load()             │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  PopupConfig { key, email, amount (kobo), currency,                     │
//! │                reference MC_<millis>_<6 digits>, metadata }             │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  PaymentSdk::open(config)          (setup(config).openIframe())         │
//! │        │                                                                │
//! │   ┌────┴───────────┐                                                    │
//! │   ▼                ▼                                                    │
//! │ Completed        Closed                                                 │
//! │   │                │                                                    │
//! │ handler.on_success handler.on_cancel()                                  │
//! │ {reference, transaction, status: paid}                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`PaystackVerifier`] confirms a reference server-side before an order is
//! trusted as paid.

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, PaymentSettings};
use crate::error::{StoreError, StoreResult};
use storefront_core::validation::validate_cod;
use storefront_core::{Money, PaymentStatus};

// =============================================================================
// Wire Types
// =============================================================================

/// Settings handed to the popup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupConfig {
    pub key: String,
    pub email: String,
    /// Minor units (kobo).
    pub amount: i64,
    pub currency: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub metadata: Value,
}

/// How the popup ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupOutcome {
    Completed { reference: String, transaction: String },
    Closed,
}

/// What the success handler receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub reference: String,
    pub transaction: String,
    pub status: PaymentStatus,
}

/// Order context shown in the provider dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMetadata {
    pub customer_name: String,
    pub customer_phone: String,
    pub item_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_state: Option<String>,
}

/// One card payment.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentDetails {
    pub email: String,
    pub amount: Money,
    pub metadata: PaymentMetadata,
}

// =============================================================================
// SDK Seams
// =============================================================================

/// The provider's popup.
#[async_trait]
pub trait PaymentSdk: Send + Sync {
    /// Configures and opens the popup, resolving when the customer finishes
    /// or closes it.
    async fn open(&self, config: PopupConfig) -> StoreResult<PopupOutcome>;
}

/// Loads the popup SDK.
#[async_trait]
pub trait SdkLoader: Send + Sync {
    async fn load(&self) -> StoreResult<Arc<dyn PaymentSdk>>;
}

/// Receives the popup result.
pub trait PaymentHandler: Send + Sync {
    fn on_success(&self, receipt: PaymentReceipt);
    fn on_cancel(&self);
}

// =============================================================================
// References
// =============================================================================

/// Builds a payment reference: `MC_<unix millis>_<6 digits>`.
pub fn generate_reference<R: Rng + ?Sized>(millis: i64, rng: &mut R) -> String {
    format!("MC_{}_{}", millis, rng.gen_range(100_000..=999_999))
}

/// Checks a cash-on-delivery total. No network.
pub fn validate_cash_on_delivery(total: Money) -> StoreResult<()> {
    Ok(validate_cod(total)?)
}

// =============================================================================
// Initiator
// =============================================================================

/// Opens card payments.
pub struct PaymentInitiator {
    loader: Arc<dyn SdkLoader>,
    sdk: OnceCell<Arc<dyn PaymentSdk>>,
    public_key: Option<String>,
    currency: String,
}

impl PaymentInitiator {
    pub fn new(settings: &PaymentSettings, loader: Arc<dyn SdkLoader>) -> Self {
        PaymentInitiator {
            loader,
            sdk: OnceCell::new(),
            public_key: settings.public_key.clone().filter(|k| !k.trim().is_empty()),
            currency: settings.currency.clone(),
        }
    }

    /// The SDK, loading it on first use. A failed load is retried next call.
    async fn sdk(&self) -> StoreResult<Arc<dyn PaymentSdk>> {
        self.sdk
            .get_or_try_init(|| async {
                info!("Loading payment SDK");
                self.loader.load().await
            })
            .await
            .cloned()
    }

    /// Opens the popup and relays the outcome to `handler`.
    ///
    /// Returns the reference the popup was opened with.
    pub async fn pay(&self, details: PaymentDetails, handler: &dyn PaymentHandler) -> StoreResult<String> {
        let key = self
            .public_key
            .clone()
            .ok_or_else(|| ConfigError::MissingCredential("payment.public_key".into()))?;

        if !details.amount.is_positive() {
            return Err(StoreError::payment("Payment amount must be greater than zero"));
        }

        let sdk = self.sdk().await?;
        let reference = generate_reference(Utc::now().timestamp_millis(), &mut rand::thread_rng());

        let config = PopupConfig {
            key,
            email: details.email,
            amount: details.amount.kobo(),
            currency: self.currency.clone(),
            reference: reference.clone(),
            metadata: serde_json::to_value(&details.metadata)
                .map_err(|e| StoreError::internal(format!("Payment metadata: {}", e)))?,
        };

        debug!(reference = %reference, amount = config.amount, "Opening payment popup");

        match sdk.open(config).await? {
            PopupOutcome::Completed { reference, transaction } => {
                info!(reference = %reference, transaction = %transaction, "Payment completed");
                handler.on_success(PaymentReceipt {
                    reference,
                    transaction,
                    status: PaymentStatus::Paid,
                });
            }
            PopupOutcome::Closed => {
                debug!(reference = %reference, "Payment popup closed");
                handler.on_cancel();
            }
        }

        Ok(reference)
    }
}

// =============================================================================
// Verification
// =============================================================================

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<VerifyData>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    /// Kobo.
    amount: i64,
    reference: String,
    #[serde(default)]
    id: Value,
}

/// Confirms payments with the provider using the secret key.
#[derive(Debug, Clone)]
pub struct PaystackVerifier {
    client: reqwest::Client,
    api_url: String,
    secret_key: String,
}

impl PaystackVerifier {
    pub fn new(settings: &PaymentSettings) -> Result<Self, ConfigError> {
        let secret_key = settings
            .secret_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingCredential("payment.secret_key".into()))?;

        Ok(PaystackVerifier {
            client: reqwest::Client::new(),
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            secret_key,
        })
    }

    /// Succeeds only when the provider reports `success` for exactly
    /// `expected`.
    pub async fn verify(&self, reference: &str, expected: Money) -> StoreResult<PaymentReceipt> {
        let url = format!("{}/transaction/verify/{}", self.api_url, reference);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| {
                warn!(reference = %reference, error = %e, "Payment verification unreachable");
                StoreError::payment("Could not verify payment. Please try again.")
            })?;

        let status = response.status();
        let body: VerifyResponse = response.json().await.map_err(|e| {
            warn!(reference = %reference, status = status.as_u16(), error = %e, "Unreadable verification response");
            StoreError::payment("Could not verify payment. Please try again.")
        })?;

        let data = match body.data {
            Some(data) if body.status && status.is_success() => data,
            _ => {
                warn!(reference = %reference, message = %body.message, "Payment not verified");
                return Err(StoreError::payment("Payment could not be verified"));
            }
        };

        if data.status != "success" {
            return Err(StoreError::payment(format!("Payment was not successful ({})", data.status)));
        }
        if data.amount != expected.kobo() {
            warn!(
                reference = %reference,
                paid = data.amount,
                expected = expected.kobo(),
                "Payment amount mismatch"
            );
            return Err(StoreError::payment("Payment amount does not match the order total"));
        }

        let transaction = match data.id {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };

        info!(reference = %data.reference, "Payment verified");
        Ok(PaymentReceipt {
            reference: data.reference,
            transaction,
            status: PaymentStatus::Paid,
        })
    }
}
