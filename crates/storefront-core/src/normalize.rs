//! # Product Normalizer
//!
//! Maps the heterogeneous product rows in the backend onto one canonical
//! shape with a single resolved display price.
//!
//! ## Resolution Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  name       := name  ──► title  ──► "Unnamed Product"                   │
//! │  image_url  := image_url ──► images[0] ──► image ──► None               │
//! │                                                                         │
//! │  display_price  := promo_price   if 0 < promo_price < price             │
//! │                    price         otherwise                              │
//! │  original_price := Some(price)   if the promo is active                 │
//! │                    None          otherwise                              │
//! │                                                                         │
//! │  Empty strings count as absent. Everything else is copied as stored.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::money::Money;
use crate::types::{Product, RawProduct};
use crate::UNNAMED_PRODUCT;

/// Columns derived by the normalizer; stale stored copies are dropped.
const DERIVED_COLUMNS: [&str; 2] = ["display_price", "original_price"];

/// Normalizes a stored product record.
///
/// Total and pure: `None` in, `None` out; never fails.
///
/// ## Example
/// ```rust
/// use storefront_core::money::Money;
/// use storefront_core::normalize::normalize_product;
/// use storefront_core::types::RawProduct;
///
/// let raw = RawProduct {
///     id: "p-1".into(),
///     title: Some("Aso Oke Cap".into()),
///     price: Money::from_naira(5_000),
///     promo_price: Some(Money::from_naira(4_000)),
///     ..Default::default()
/// };
///
/// let product = normalize_product(Some(raw)).unwrap();
/// assert_eq!(product.name, "Aso Oke Cap");
/// assert_eq!(product.display_price, Money::from_naira(4_000));
/// assert_eq!(product.original_price, Some(Money::from_naira(5_000)));
/// ```
pub fn normalize_product(raw: Option<RawProduct>) -> Option<Product> {
    let raw = raw?;

    let name = non_empty(raw.name.as_deref())
        .or_else(|| non_empty(raw.title.as_deref()))
        .unwrap_or(UNNAMED_PRODUCT)
        .to_string();

    let image_url = non_empty(raw.image_url.as_deref())
        .or_else(|| {
            raw.images
                .as_ref()
                .and_then(|images| images.first())
                .and_then(|first| non_empty(Some(first.as_str())))
        })
        .or_else(|| non_empty(raw.image.as_deref()))
        .map(str::to_string);

    let (display_price, original_price) = resolve_display_price(raw.price, raw.promo_price);

    let mut extra = raw.extra;
    for column in DERIVED_COLUMNS {
        extra.remove(column);
    }

    Some(Product {
        id: raw.id,
        name,
        image_url,
        title: raw.title,
        images: raw.images,
        image: raw.image,
        price: raw.price,
        promo_price: raw.promo_price,
        display_price,
        original_price,
        stock: raw.stock,
        category: raw.category,
        is_active: raw.is_active,
        extra,
    })
}

/// Resolves `(display_price, original_price)` for a price and optional promo.
///
/// ## Example
/// ```rust
/// use storefront_core::money::Money;
/// use storefront_core::normalize::resolve_display_price;
///
/// let price = Money::from_naira(1_000);
/// assert_eq!(
///     resolve_display_price(price, Some(Money::from_naira(800))),
///     (Money::from_naira(800), Some(price))
/// );
/// // A "promo" at or above the list price is ignored.
/// assert_eq!(resolve_display_price(price, Some(price)), (price, None));
/// ```
pub fn resolve_display_price(price: Money, promo_price: Option<Money>) -> (Money, Option<Money>) {
    match promo_price {
        Some(promo) if promo.is_positive() && promo < price => (promo, Some(price)),
        _ => (price, None),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawProduct {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_none_maps_to_none() {
        assert_eq!(normalize_product(None), None);
    }

    #[test]
    fn test_name_resolution_order() {
        let p = normalize_product(Some(raw(json!({"id": "1", "name": "Kaftan", "title": "Old"})))).unwrap();
        assert_eq!(p.name, "Kaftan");

        let p = normalize_product(Some(raw(json!({"id": "1", "name": "", "title": "Agbada"})))).unwrap();
        assert_eq!(p.name, "Agbada");

        let p = normalize_product(Some(raw(json!({"id": "1"})))).unwrap();
        assert_eq!(p.name, UNNAMED_PRODUCT);
    }

    #[test]
    fn test_image_resolution_order() {
        let p = normalize_product(Some(raw(json!({
            "id": "1", "image_url": "a.jpg", "images": ["b.jpg"], "image": "c.jpg"
        }))))
        .unwrap();
        assert_eq!(p.image_url.as_deref(), Some("a.jpg"));

        let p = normalize_product(Some(raw(json!({"id": "1", "images": ["b.jpg", "x.jpg"], "image": "c.jpg"})))).unwrap();
        assert_eq!(p.image_url.as_deref(), Some("b.jpg"));

        let p = normalize_product(Some(raw(json!({"id": "1", "images": [], "image": "c.jpg"})))).unwrap();
        assert_eq!(p.image_url.as_deref(), Some("c.jpg"));

        let p = normalize_product(Some(raw(json!({"id": "1"})))).unwrap();
        assert_eq!(p.image_url, None);
    }

    #[test]
    fn test_promo_correctness_grid() {
        let prices = [0, 1, 500, 1_000, 25_000];
        let promos = [None, Some(-5), Some(0), Some(1), Some(499), Some(500), Some(999), Some(1_000), Some(30_000)];

        for price in prices {
            for promo in promos {
                let price_m = Money::from_naira(price);
                let promo_m = promo.map(Money::from_naira);
                let (display, original) = resolve_display_price(price_m, promo_m);

                let active = matches!(promo, Some(p) if 0 < p && p < price);
                if active {
                    assert_eq!(display, promo_m.unwrap(), "price {price} promo {promo:?}");
                    assert_eq!(original, Some(price_m));
                } else {
                    assert_eq!(display, price_m, "price {price} promo {promo:?}");
                    assert_eq!(original, None);
                }
            }
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = vec![
            json!({"id": 7, "title": "Ofada Rice 5kg", "price": 9000, "promo_price": 7500, "images": ["r.jpg"]}),
            json!({"id": "8", "name": "Palm Oil", "price": 4200.5, "promo_price": 5000, "stock": 0}),
            json!({"id": "9", "price": 100, "image": "", "display_price": 1, "original_price": 2, "color": "red"}),
            json!({"id": "10", "name": "   ", "title": "", "is_active": false}),
        ];

        for sample in samples {
            let once = normalize_product(Some(raw(sample.clone()))).unwrap();
            let twice = normalize_product(Some(once.clone().into_raw())).unwrap();
            assert_eq!(once, twice, "sample {sample}");
        }
    }

    #[test]
    fn test_other_fields_are_copied() {
        let p = normalize_product(Some(raw(json!({
            "id": "1", "name": "Beads", "stock": 4, "category": "jewellery", "is_active": false, "vendor": "Bida"
        }))))
        .unwrap();
        assert_eq!(p.stock, Some(4));
        assert_eq!(p.category.as_deref(), Some("jewellery"));
        assert!(!p.is_active);
        assert_eq!(p.extra.get("vendor"), Some(&json!("Bida")));
    }

    #[test]
    fn test_stale_derived_columns_are_dropped() {
        let p = normalize_product(Some(raw(json!({"id": "1", "price": 100, "display_price": 1})))).unwrap();
        assert!(!p.extra.contains_key("display_price"));
        assert_eq!(p.display_price, Money::from_naira(100));

        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["display_price"], json!(100));
    }
}
