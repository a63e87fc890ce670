//! # Shipping Rate Resolver
//!
//! Asks the courier API for delivery options and falls back to the flat-rate
//! table whenever it cannot. Checkout never waits on a courier outage.
//!
//! ## Resolution
//! ```text
//! get_rates(request)
//!      │
//!      ├── no API key ─────────────────────────────┐
//!      │                                           │
//!      ▼                                           │
//! POST {api_url}/shipping/fetch_rates              │
//!      │                                           │
//!      ├── transport error / non-2xx ──────────────┤
//!      ├── body not JSON ──────────────────────────┤
//!      ├── zero usable entries ────────────────────┤
//!      ▼                                           ▼
//! RateQuote { source: shipbubble }     RateQuote::fallback(address)
//! ```
//!
//! ## Response Shapes
//! The provider has shipped several layouts. Entries are looked up at
//! `data.couriers`, `data.rates`, `couriers`, `rates`, or a bare array, and
//! each field is read from the first alternate key present.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ShippingSettings;
use storefront_core::money::naira;
use storefront_core::shipping::{RateQuote, RateRequest, RateSource, ShippingRate};

const COURIER_ID_KEYS: &[&str] = &["courier_id", "id", "service_id"];
const COURIER_NAME_KEYS: &[&str] = &["courier_name", "name"];
const SERVICE_CODE_KEYS: &[&str] = &["service_code", "code"];
const FEE_KEYS: &[&str] = &["total", "amount", "rate_card_amount", "fee", "delivery_fee"];
const ETA_KEYS: &[&str] = &["delivery_eta", "eta", "estimated_delivery"];
const LOGO_KEYS: &[&str] = &["courier_image", "logo", "image"];

#[derive(Debug, Error)]
enum RateError {
    #[error("no courier API key configured")]
    NotConfigured,

    #[error("courier API unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("courier API answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("courier API returned invalid JSON: {0}")]
    Body(#[from] serde_json::Error),

    #[error("courier API returned no rates")]
    Empty,
}

/// Resolves delivery options for a parcel.
#[derive(Debug, Clone)]
pub struct ShippingResolver {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl ShippingResolver {
    pub fn new(settings: &ShippingSettings) -> Self {
        ShippingResolver {
            client: reqwest::Client::new(),
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone().filter(|k| !k.trim().is_empty()),
        }
    }

    /// Returns delivery options. Never fails and never returns an empty list.
    pub async fn get_rates(&self, request: &RateRequest) -> RateQuote {
        match self.fetch_live(request).await {
            Ok(rates) => {
                info!(count = rates.len(), "Live shipping rates");
                RateQuote {
                    rates,
                    source: RateSource::Shipbubble,
                }
            }
            Err(e) => {
                warn!(
                    state = %request.recipient_address.state,
                    error = %e,
                    "Using flat-rate shipping table"
                );
                RateQuote::fallback(&request.recipient_address)
            }
        }
    }

    async fn fetch_live(&self, request: &RateRequest) -> Result<Vec<ShippingRate>, RateError> {
        let key = self.api_key.as_deref().ok_or(RateError::NotConfigured)?;
        let url = format!("{}/shipping/fetch_rates", self.api_url);

        debug!(url = %url, weight = request.total_weight, "Requesting courier rates");

        let response = self
            .client
            .post(&url)
            .bearer_auth(key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(RateError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let body: Value = serde_json::from_str(&text)?;
        let rates = parse_rates(&body);
        if rates.is_empty() {
            return Err(RateError::Empty);
        }
        Ok(rates)
    }
}

// =============================================================================
// Response Parsing
// =============================================================================

fn rate_entries(body: &Value) -> &[Value] {
    let candidates = [
        body.pointer("/data/couriers"),
        body.pointer("/data/rates"),
        body.get("couriers"),
        body.get("rates"),
        Some(body),
    ];

    candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn first<'a>(entry: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| entry.get(*k))
        .find(|v| !v.is_null())
}

fn first_text(entry: &Value, keys: &[&str]) -> Option<String> {
    first(entry, keys).and_then(|v| match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Reads every usable entry. Entries without a fee are dropped.
fn parse_rates(body: &Value) -> Vec<ShippingRate> {
    rate_entries(body)
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let fee = match first(entry, FEE_KEYS).map(naira::from_value) {
                Some(Ok(Some(fee))) => fee,
                _ => {
                    debug!(index, "Skipping courier entry without a fee");
                    return None;
                }
            };

            let courier_id = first_text(entry, COURIER_ID_KEYS).unwrap_or_else(|| format!("courier-{}", index));
            let courier_name = first_text(entry, COURIER_NAME_KEYS).unwrap_or_else(|| courier_id.clone());

            Some(ShippingRate {
                service_code: first_text(entry, SERVICE_CODE_KEYS).unwrap_or_else(|| courier_id.clone()),
                courier_id,
                courier_name,
                delivery_fee: fee,
                eta: first_text(entry, ETA_KEYS).unwrap_or_default(),
                logo: first_text(entry, LOGO_KEYS),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use storefront_core::shipping::{PackageItem, RecipientAddress};
    use storefront_core::Money;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(state: &str) -> RateRequest {
        RateRequest::new(
            RecipientAddress {
                full_name: "Tunde Bakare".into(),
                email: "tunde@example.com".into(),
                phone: "08030000000".into(),
                street: "4 Ring Road".into(),
                city: "Ibadan".into(),
                state: state.into(),
            },
            vec![PackageItem {
                name: "Aso-oke".into(),
                quantity: 2,
                weight: 0.5,
            }],
        )
    }

    fn resolver(server: &MockServer) -> ShippingResolver {
        ShippingResolver::new(&ShippingSettings {
            api_url: format!("{}/v1/", server.uri()),
            api_key: Some("sb_test".into()),
        })
    }

    #[test]
    fn test_parse_alternate_layouts() {
        let nested = json!({"data": {"couriers": [
            {"courier_id": "gig", "courier_name": "GIG", "service_code": "gig-std", "total": 2500,
             "delivery_eta": "2 days", "courier_image": "https://cdn/gig.png"}
        ]}});
        let flat = json!({"rates": [{"id": 7, "name": "Kwik", "amount": "1800.50", "eta": "Same day"}]});
        let bare = json!([{"service_id": "dhl", "fee": 9000}]);

        let rates = parse_rates(&nested);
        assert_eq!(rates[0].courier_id, "gig");
        assert_eq!(rates[0].delivery_fee, Money::from_naira(2_500));
        assert_eq!(rates[0].logo.as_deref(), Some("https://cdn/gig.png"));

        let rates = parse_rates(&flat);
        assert_eq!(rates[0].courier_id, "7");
        assert_eq!(rates[0].delivery_fee, Money::from_kobo(180_050));
        assert_eq!(rates[0].service_code, "7");

        let rates = parse_rates(&bare);
        assert_eq!(rates[0].courier_name, "dhl");
        assert_eq!(rates[0].eta, "");
    }

    #[test]
    fn test_entries_without_fee_are_dropped() {
        let body = json!({"data": {"rates": [{"courier_id": "x"}, {"courier_id": "y", "rate_card_amount": 3100}]}});
        let rates = parse_rates(&body);
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].courier_id, "y");
    }

    #[tokio::test]
    async fn test_live_rates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/shipping/fetch_rates"))
            .and(header("authorization", "Bearer sb_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {"couriers": [{"courier_id": "gig", "courier_name": "GIG", "total": 3200}]}
            })))
            .mount(&server)
            .await;

        let quote = resolver(&server).get_rates(&request("Oyo")).await;
        assert_eq!(quote.source, RateSource::Shipbubble);
        assert_eq!(quote.rates.len(), 1);
    }

    #[tokio::test]
    async fn test_provider_error_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let quote = resolver(&server).get_rates(&request("Oyo")).await;
        assert_eq!(quote.source, RateSource::Fallback);
        assert_eq!(quote.rates.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_rates_fall_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"couriers": []}})))
            .mount(&server)
            .await;

        let quote = resolver(&server).get_rates(&request("Kano")).await;
        assert_eq!(quote.source, RateSource::Fallback);
        assert!(!quote.rates.is_empty());
    }

    #[tokio::test]
    async fn test_garbage_body_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let quote = resolver(&server).get_rates(&request("Lagos")).await;
        assert_eq!(quote.source, RateSource::Fallback);
    }

    #[tokio::test]
    async fn test_unconfigured_key_skips_network() {
        let resolver = ShippingResolver::new(&ShippingSettings {
            api_url: "http://127.0.0.1:9".into(),
            api_key: Some("   ".into()),
        });
        let quote = resolver.get_rates(&request("Abia")).await;
        assert_eq!(quote.source, RateSource::Fallback);
        assert_eq!(quote.rates.len(), 2);
    }
}
