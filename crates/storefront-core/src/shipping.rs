//! # Shipping Types and Flat-Rate Fallback
//!
//! Wire shapes for rate quotes, plus the static table used whenever the
//! courier API is down or returns nothing.
//!
//! ## Fallback Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Region          Matches (state, then city)      Express     Standard   │
//! │  ──────────────  ──────────────────────────────  ─────────   ────────── │
//! │  Lagos           lagos, ikeja, lekki, ...        ₦3,000      ₦2,000     │
//! │  South-West      ogun, oyo, osun, ondo, ekiti    ₦4,500      ₦3,000     │
//! │  North-Central   fct, abuja, kwara, niger, ...   ₦5,500      ₦4,000     │
//! │  South-South     rivers, delta, edo, ...         ₦6,000      ₦4,500     │
//! │  South-East      enugu, anambra, imo, ...        ₦6,000      ₦4,500     │
//! │  North           kano, kaduna, borno, ...        ₦7,000      ₦5,500     │
//! │  Rest of country (no match)                      ₦7,500      ₦6,000     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Matching is a case-insensitive substring search. Buckets are tried in the
//! order above and the first hit wins. The word "nigeria" is removed first so
//! an address like "Lagos, Nigeria" does not also hit "niger".

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{naira, Money};

// =============================================================================
// Request Types
// =============================================================================

/// Where the parcel goes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RecipientAddress {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
}

/// One item in the parcel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PackageItem {
    pub name: String,
    pub quantity: i64,
    /// Kilograms per unit.
    pub weight: f64,
}

/// Input to the rate resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RateRequest {
    pub recipient_address: RecipientAddress,
    pub items: Vec<PackageItem>,
    /// Kilograms.
    pub total_weight: f64,
}

impl RateRequest {
    /// Builds a request, summing `weight × quantity` for the total.
    pub fn new(recipient_address: RecipientAddress, items: Vec<PackageItem>) -> Self {
        let total_weight = items.iter().map(|i| i.weight * i.quantity as f64).sum();
        RateRequest {
            recipient_address,
            items,
            total_weight,
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// One delivery option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShippingRate {
    pub courier_id: String,
    pub courier_name: String,
    pub service_code: String,
    #[serde(with = "naira")]
    #[ts(type = "number")]
    pub delivery_fee: Money,
    pub eta: String,
    pub logo: Option<String>,
}

/// Where a quote came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    /// Live courier pricing.
    Shipbubble,
    /// The static table in this module.
    Fallback,
}

/// A list of delivery options tagged with their source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RateQuote {
    pub rates: Vec<ShippingRate>,
    pub source: RateSource,
}

impl RateQuote {
    /// Builds a quote from the flat-rate table.
    pub fn fallback(address: &RecipientAddress) -> Self {
        RateQuote {
            rates: fallback_rates(address),
            source: RateSource::Fallback,
        }
    }

    /// Returns the cheapest option, if any.
    pub fn cheapest(&self) -> Option<&ShippingRate> {
        self.rates.iter().min_by_key(|r| r.delivery_fee)
    }
}

// =============================================================================
// Regions
// =============================================================================

/// Geographic bucket of the fallback table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Lagos,
    SouthWest,
    NorthCentral,
    SouthSouth,
    SouthEast,
    North,
    RestOfCountry,
}

impl Region {
    /// Short identifier used in fallback courier ids.
    pub fn slug(&self) -> &'static str {
        match self {
            Region::Lagos => "lagos",
            Region::SouthWest => "south-west",
            Region::NorthCentral => "north-central",
            Region::SouthSouth => "south-south",
            Region::SouthEast => "south-east",
            Region::North => "north",
            Region::RestOfCountry => "rest-of-country",
        }
    }
}

struct Tariff {
    fee_naira: i64,
    eta: &'static str,
}

struct Bucket {
    region: Region,
    keywords: &'static [&'static str],
    express: Tariff,
    standard: Tariff,
}

const BUCKETS: [Bucket; 6] = [
    Bucket {
        region: Region::Lagos,
        keywords: &["lagos", "ikeja", "lekki", "victoria island", "ikorodu", "badagry"],
        express: Tariff { fee_naira: 3_000, eta: "Same day - 1 business day" },
        standard: Tariff { fee_naira: 2_000, eta: "1-2 business days" },
    },
    Bucket {
        region: Region::SouthWest,
        keywords: &["ogun", "oyo", "osun", "ondo", "ekiti", "ibadan", "abeokuta", "akure", "osogbo"],
        express: Tariff { fee_naira: 4_500, eta: "1-2 business days" },
        standard: Tariff { fee_naira: 3_000, eta: "2-4 business days" },
    },
    Bucket {
        region: Region::NorthCentral,
        keywords: &[
            "fct", "abuja", "federal capital", "kwara", "kogi", "benue", "plateau", "nasarawa",
            "niger", "ilorin", "lokoja", "makurdi", "minna",
        ],
        express: Tariff { fee_naira: 5_500, eta: "2-3 business days" },
        standard: Tariff { fee_naira: 4_000, eta: "3-5 business days" },
    },
    Bucket {
        region: Region::SouthSouth,
        keywords: &[
            "rivers", "delta", "edo", "bayelsa", "cross river", "akwa ibom", "port harcourt",
            "warri", "calabar", "benin city",
        ],
        express: Tariff { fee_naira: 6_000, eta: "2-3 business days" },
        standard: Tariff { fee_naira: 4_500, eta: "3-5 business days" },
    },
    Bucket {
        region: Region::SouthEast,
        keywords: &["enugu", "anambra", "imo", "abia", "ebonyi", "onitsha", "owerri", "awka", "abakaliki"],
        express: Tariff { fee_naira: 6_000, eta: "2-3 business days" },
        standard: Tariff { fee_naira: 4_500, eta: "3-5 business days" },
    },
    Bucket {
        region: Region::North,
        keywords: &[
            "kano", "kaduna", "katsina", "sokoto", "kebbi", "zamfara", "jigawa", "bauchi", "gombe",
            "borno", "yobe", "adamawa", "taraba", "maiduguri", "zaria",
        ],
        express: Tariff { fee_naira: 7_000, eta: "3-4 business days" },
        standard: Tariff { fee_naira: 5_500, eta: "4-7 business days" },
    },
];

const REST_OF_COUNTRY_EXPRESS: Tariff = Tariff { fee_naira: 7_500, eta: "3-5 business days" };
const REST_OF_COUNTRY_STANDARD: Tariff = Tariff { fee_naira: 6_000, eta: "5-7 business days" };

fn match_bucket(text: &str) -> Option<&'static Bucket> {
    let haystack = text.to_lowercase().replace("nigeria", " ");
    if haystack.trim().is_empty() {
        return None;
    }
    BUCKETS
        .iter()
        .find(|bucket| bucket.keywords.iter().any(|kw| haystack.contains(kw)))
}

/// Finds the fallback region for a state, falling back to the city.
///
/// ## Example
/// ```rust
/// use storefront_core::shipping::{region_for, Region};
///
/// assert_eq!(region_for("Lagos State", ""), Region::Lagos);
/// assert_eq!(region_for("", "Port Harcourt"), Region::SouthSouth);
/// assert_eq!(region_for("Nigeria", ""), Region::RestOfCountry);
/// ```
pub fn region_for(state: &str, city: &str) -> Region {
    match_bucket(state)
        .or_else(|| match_bucket(city))
        .map(|b| b.region)
        .unwrap_or(Region::RestOfCountry)
}

/// Flat-rate options for an address. Never empty.
pub fn fallback_rates(address: &RecipientAddress) -> Vec<ShippingRate> {
    let bucket = match_bucket(&address.state).or_else(|| match_bucket(&address.city));

    let (region, express, standard) = match bucket {
        Some(b) => (b.region, &b.express, &b.standard),
        None => (
            Region::RestOfCountry,
            &REST_OF_COUNTRY_EXPRESS,
            &REST_OF_COUNTRY_STANDARD,
        ),
    };

    vec![
        flat_rate(region, "express", "Express Delivery", express),
        flat_rate(region, "standard", "Standard Delivery", standard),
    ]
}

fn flat_rate(region: Region, code: &str, name: &str, tariff: &Tariff) -> ShippingRate {
    ShippingRate {
        courier_id: format!("fallback-{}-{}", region.slug(), code),
        courier_name: name.to_string(),
        service_code: code.to_string(),
        delivery_fee: Money::from_naira(tariff.fee_naira),
        eta: tariff.eta.to_string(),
        logo: None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn address(state: &str, city: &str) -> RecipientAddress {
        RecipientAddress {
            full_name: "Chiamaka Obi".into(),
            email: "chi@example.com".into(),
            phone: "08030000000".into(),
            street: "12 Allen Avenue".into(),
            city: city.into(),
            state: state.into(),
        }
    }

    #[test]
    fn test_state_matching_is_case_insensitive() {
        assert_eq!(region_for("LAGOS", ""), Region::Lagos);
        assert_eq!(region_for("oyo state", ""), Region::SouthWest);
        assert_eq!(region_for("FCT", ""), Region::NorthCentral);
        assert_eq!(region_for("Cross River", ""), Region::SouthSouth);
        assert_eq!(region_for("Anambra", ""), Region::SouthEast);
        assert_eq!(region_for("Kano", ""), Region::North);
    }

    #[test]
    fn test_country_name_does_not_match_niger() {
        assert_eq!(region_for("Lagos, Nigeria", ""), Region::Lagos);
        assert_eq!(region_for("Nigeria", ""), Region::RestOfCountry);
        assert_eq!(region_for("Niger", ""), Region::NorthCentral);
    }

    #[test]
    fn test_city_is_used_when_state_does_not_match() {
        assert_eq!(region_for("", "Abuja"), Region::NorthCentral);
        assert_eq!(region_for("Unknown", "Ibadan"), Region::SouthWest);
        assert_eq!(region_for("", ""), Region::RestOfCountry);
    }

    #[test]
    fn test_every_bucket_offers_express_and_standard() {
        for state in ["Lagos", "Ekiti", "Benue", "Delta", "Imo", "Borno", "Atlantis"] {
            let rates = fallback_rates(&address(state, ""));
            assert_eq!(rates.len(), 2, "{state}");
            assert_eq!(rates[0].service_code, "express");
            assert_eq!(rates[1].service_code, "standard");
            assert!(rates[0].delivery_fee > rates[1].delivery_fee);
            assert!(!rates[0].eta.is_empty());
        }
    }

    #[test]
    fn test_fallback_quote_is_tagged() {
        let quote = RateQuote::fallback(&address("Lagos", "Ikeja"));
        assert_eq!(quote.source, RateSource::Fallback);
        assert_eq!(quote.cheapest().map(|r| r.delivery_fee), Some(Money::from_naira(2_000)));
        assert_eq!(quote.rates[0].courier_id, "fallback-lagos-express");

        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["source"], "fallback");
        assert_eq!(json["rates"][0]["delivery_fee"], 3000);
    }

    #[test]
    fn test_rate_request_wire_shape() {
        let request = RateRequest::new(
            address("Lagos", "Ikeja"),
            vec![PackageItem { name: "Shoes".into(), quantity: 2, weight: 1.5 }],
        );
        assert!((request.total_weight - 3.0).abs() < f64::EPSILON);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["recipientAddress"]["fullName"], "Chiamaka Obi");
        assert_eq!(json["totalWeight"], 3.0);
    }
}
