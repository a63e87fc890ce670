//! # Domain Types
//!
//! Records exchanged with the hosted REST backend.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   RawProduct    │   │    CartItem     │   │     Order       │       │
//! │  │  (as stored)    │   │  ─────────────  │   │  ─────────────  │       │
//! │  │       │         │   │  uid ┐ unique   │   │  order_number   │       │
//! │  │  normalize()    │   │  product_id ┘   │   │  items (JSON    │       │
//! │  │       ▼         │   │  quantity ≥ 1   │   │   snapshot)     │       │
//! │  │    Product      │   │  price snapshot │   │  status         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  WishlistItem   │   │     Review      │   │ StockAdjustment │       │
//! │  │  uid+product_id │   │  rating 1-5     │   │ queued stock    │       │
//! │  │  unique         │   │  no uniqueness  │   │ decrement       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Cart lines and order items copy the product name, image and price at the
//! moment they are written. Later product edits never change what a customer
//! already has in their cart or what they were charged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::money::{naira, Money};

// =============================================================================
// Lenient Identifiers
// =============================================================================

/// Row ids arrive as strings (uuid) or numbers (bigserial) depending on the
/// table. Both are kept as strings.
pub(crate) fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or numeric id, got {}",
            other
        ))),
    }
}

pub(crate) fn optional_id_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or numeric id, got {}",
            other
        ))),
    }
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Product
// =============================================================================

/// A product record exactly as the backend stores it.
///
/// Older rows use `title` instead of `name`, and `images` or `image` instead
/// of `image_url`. Every column this type does not name is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProduct {
    #[serde(deserialize_with = "id_string")]
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub image_url: Option<String>,

    #[serde(default)]
    pub images: Option<Vec<String>>,

    #[serde(default)]
    pub image: Option<String>,

    #[serde(default, with = "naira")]
    pub price: Money,

    #[serde(default, with = "naira::option")]
    pub promo_price: Option<Money>,

    #[serde(default)]
    pub stock: Option<i64>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Every other stored column, copied through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A product in canonical shape, produced by
/// [`normalize_product`](crate::normalize::normalize_product).
///
/// ## Invariants
/// - `name` is never empty
/// - `display_price == promo_price` iff `0 < promo_price < price`,
///   otherwise `display_price == price`
/// - `original_price` is `Some(price)` only while a promo is active
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: String,

    /// Resolved display name.
    pub name: String,

    /// Resolved primary image.
    pub image_url: Option<String>,

    pub title: Option<String>,

    pub images: Option<Vec<String>>,

    pub image: Option<String>,

    #[serde(with = "naira")]
    #[ts(type = "number")]
    pub price: Money,

    #[serde(default, with = "naira::option")]
    #[ts(type = "number | null")]
    pub promo_price: Option<Money>,

    /// The price the customer pays.
    #[serde(with = "naira")]
    #[ts(type = "number")]
    pub display_price: Money,

    /// The crossed-out price while a promo is running.
    #[serde(default, with = "naira::option")]
    #[ts(type = "number | null")]
    pub original_price: Option<Money>,

    pub stock: Option<i64>,

    pub category: Option<String>,

    pub is_active: bool,

    #[serde(flatten)]
    #[ts(skip)]
    pub extra: Map<String, Value>,
}

impl Product {
    /// Returns true while a promo price is in effect.
    #[inline]
    pub fn on_promo(&self) -> bool {
        self.original_price.is_some()
    }

    /// Checks if the product can be ordered in the given quantity.
    ///
    /// Products with no stock column are treated as untracked.
    pub fn can_order(&self, quantity: i64) -> bool {
        if !self.is_active {
            return false;
        }
        match self.stock {
            Some(stock) => stock >= quantity,
            None => true,
        }
    }

    /// Converts back to the stored shape.
    ///
    /// The resolved `name` and `image_url` are written into the stored
    /// columns, so normalizing the result yields this product again.
    pub fn into_raw(self) -> RawProduct {
        RawProduct {
            id: self.id,
            name: Some(self.name),
            title: self.title,
            image_url: self.image_url,
            images: self.images,
            image: self.image,
            price: self.price,
            promo_price: self.promo_price,
            stock: self.stock,
            category: self.category,
            is_active: self.is_active,
            extra: self.extra,
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// One cart row. Exactly one exists per (uid, product_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartItem {
    #[serde(default, deserialize_with = "optional_id_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub uid: String,

    #[serde(deserialize_with = "id_string")]
    pub product_id: String,

    /// Product name at add time.
    #[serde(default)]
    pub name: String,

    /// Unit price at add time.
    #[serde(default, with = "naira")]
    #[ts(type = "number")]
    pub price: Money,

    #[serde(default)]
    pub image_url: Option<String>,

    pub quantity: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CartItem {
    /// Builds a new cart line from a normalized product.
    ///
    /// The unit price is the product's display price, so a running promo is
    /// locked in for this line.
    pub fn snapshot(uid: impl Into<String>, product: &Product, quantity: i64) -> Self {
        CartItem {
            id: None,
            uid: uid.into(),
            product_id: product.id.clone(),
            name: product.name.clone(),
            price: product.display_price,
            image_url: product.image_url.clone(),
            quantity,
            created_at: None,
            updated_at: None,
        }
    }

    /// Returns `price × quantity`.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.price.multiply_quantity(self.quantity)
    }

    /// Converts this line into an order item snapshot.
    pub fn to_order_line(&self) -> OrderLine {
        OrderLine {
            product_id: self.product_id.clone(),
            name: self.name.clone(),
            price: self.price,
            quantity: self.quantity,
            image_url: self.image_url.clone(),
        }
    }
}

/// What an add-to-cart call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CartAction {
    /// A new row was created.
    Added,
    /// An existing row's quantity was increased.
    Updated,
}

/// Result of an add-to-cart call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartAddOutcome {
    pub action: CartAction,
    /// Quantity of the row after the write.
    pub quantity: i64,
}

/// Sums a cart's line totals.
pub fn cart_subtotal(items: &[CartItem]) -> Money {
    items.iter().map(CartItem::line_total).sum()
}

// =============================================================================
// Wishlist
// =============================================================================

/// One wishlist row. Exactly one exists per (uid, product_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WishlistItem {
    #[serde(default, deserialize_with = "optional_id_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub uid: String,

    #[serde(deserialize_with = "id_string")]
    pub product_id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, with = "naira::option")]
    #[ts(type = "number | null")]
    pub price: Option<Money>,

    #[serde(default)]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
}

impl WishlistItem {
    /// Builds a wishlist row from a normalized product.
    pub fn snapshot(uid: impl Into<String>, product: &Product) -> Self {
        WishlistItem {
            id: None,
            uid: uid.into(),
            product_id: product.id.clone(),
            name: Some(product.name.clone()),
            price: Some(product.display_price),
            image_url: product.image_url.clone(),
            created_at: None,
        }
    }
}

/// Result of an add-to-wishlist call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum WishlistAddOutcome {
    Added,
    /// The pair was already present; nothing was written.
    AlreadyExists,
}

// =============================================================================
// Order Enums
// =============================================================================

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card/bank payment through the payment popup.
    Paystack,
    /// Cash collected by the rider.
    CashOnDelivery,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Paystack => write!(f, "paystack"),
            PaymentMethod::CashOnDelivery => write!(f, "cash_on_delivery"),
        }
    }
}

/// Whether the order has been paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

impl PaymentStatus {
    /// `paid` when a payment reference exists, `pending` otherwise.
    pub fn for_reference(reference: Option<&str>) -> Self {
        match reference {
            Some(r) if !r.trim().is_empty() => PaymentStatus::Paid,
            _ => PaymentStatus::Pending,
        }
    }
}

/// Fulfilment status. Only `processing` is written here; operators move
/// orders through the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    #[default]
    Processing,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
    /// A value written by an operator tool this version does not know.
    #[serde(other)]
    Unknown,
}

// =============================================================================
// Order
// =============================================================================

/// One entry of an order's item snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLine {
    #[serde(deserialize_with = "id_string")]
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(with = "naira")]
    #[ts(type = "number")]
    pub price: Money,
    pub quantity: i64,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    #[serde(default, deserialize_with = "optional_id_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// `MC-<year>-<6 digits>`.
    pub order_number: String,

    pub uid: String,

    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,

    /// JSON-serialized `Vec<OrderLine>`, stored as a string.
    pub items: String,

    pub address: String,
    pub city: String,
    pub state: String,
    #[serde(default)]
    pub notes: Option<String>,

    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub payment_status: PaymentStatus,

    #[serde(default)]
    pub status: OrderStatus,

    #[serde(with = "naira")]
    #[ts(type = "number")]
    pub subtotal: Money,
    #[serde(default, with = "naira")]
    #[ts(type = "number")]
    pub delivery_fee: Money,
    #[serde(with = "naira")]
    #[ts(type = "number")]
    pub total: Money,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Parses the item snapshot.
    pub fn line_items(&self) -> CoreResult<Vec<OrderLine>> {
        Ok(serde_json::from_str(&self.items)?)
    }
}

/// Serializes order lines into the string stored in `orders.items`.
pub fn encode_items(lines: &[OrderLine]) -> CoreResult<String> {
    Ok(serde_json::to_string(lines)?)
}

// =============================================================================
// Review
// =============================================================================

/// A product review. A user may leave several per product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Review {
    #[serde(default, deserialize_with = "optional_id_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub uid: String,

    #[serde(deserialize_with = "id_string")]
    pub product_id: String,

    pub user_name: String,

    /// 1 to 5 stars.
    pub rating: i32,

    #[serde(default)]
    pub comment: String,

    /// True when the reviewer has a delivered order for the product.
    #[serde(default)]
    pub verified: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Average rating and count for one product.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReviewSummary {
    pub count: usize,
    /// Mean rating, 0.0 when there are no reviews.
    pub average: f64,
}

impl ReviewSummary {
    pub fn from_reviews(reviews: &[Review]) -> Self {
        if reviews.is_empty() {
            return ReviewSummary::default();
        }
        let total: i64 = reviews.iter().map(|r| r.rating as i64).sum();
        ReviewSummary {
            count: reviews.len(),
            average: total as f64 / reviews.len() as f64,
        }
    }
}

// =============================================================================
// User Profile
// =============================================================================

/// Profile row mirrored from the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserProfile {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Stock Adjustment
// =============================================================================

/// A stock decrement that could not be applied during checkout.
///
/// ## Lifecycle
/// ```text
/// checkout: decrement fails ──► enqueue (attempts = 0)
///                                    │
///               reconciler poll ◄────┘
///                    │
///          ┌─────────┴──────────┐
///          ▼                    ▼
///    applied_at = now     attempts += 1, last_error
///                         (skipped once attempts hit the limit)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAdjustment {
    pub id: String,
    #[serde(default, deserialize_with = "optional_id_string")]
    pub order_id: Option<String>,
    pub order_number: String,
    #[serde(deserialize_with = "id_string")]
    pub product_id: String,
    /// Units to subtract from stock.
    pub quantity: i64,
    #[serde(default)]
    pub attempts: i64,
    #[serde(default)]
    pub last_error: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub attempted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub applied_at: Option<DateTime<Utc>>,
}

/// New stock level after selling `quantity` units: never below zero.
///
/// ## Example
/// ```rust
/// use storefront_core::types::decremented_stock;
///
/// assert_eq!(decremented_stock(5, 1), 4);
/// assert_eq!(decremented_stock(2, 3), 0);
/// ```
#[inline]
pub fn decremented_stock(stock: i64, quantity: i64) -> i64 {
    (stock - quantity).max(0)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_product_keeps_unknown_columns() {
        let raw: RawProduct = serde_json::from_value(json!({
            "id": 42,
            "title": "Adire Scarf",
            "price": 8500,
            "stock": 3,
            "brand": "Ìyá Àdìrẹ"
        }))
        .unwrap();

        assert_eq!(raw.id, "42");
        assert_eq!(raw.title.as_deref(), Some("Adire Scarf"));
        assert_eq!(raw.price, Money::from_naira(8_500));
        assert!(raw.is_active);
        assert_eq!(raw.extra.get("brand"), Some(&json!("Ìyá Àdìrẹ")));
    }

    #[test]
    fn test_order_status_tolerates_operator_values() {
        let status: OrderStatus = serde_json::from_value(json!("out_for_delivery")).unwrap();
        assert_eq!(status, OrderStatus::Unknown);

        let status: OrderStatus = serde_json::from_value(json!("processing")).unwrap();
        assert_eq!(status, OrderStatus::Processing);
    }

    #[test]
    fn test_payment_status_for_reference() {
        assert_eq!(PaymentStatus::for_reference(Some("MC_1_123456")), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::for_reference(Some("  ")), PaymentStatus::Pending);
        assert_eq!(PaymentStatus::for_reference(None), PaymentStatus::Pending);
    }

    #[test]
    fn test_order_items_snapshot_round_trip() {
        let lines = vec![OrderLine {
            product_id: "p-1".to_string(),
            name: "Shea Butter".to_string(),
            price: Money::from_naira(3_000),
            quantity: 2,
            image_url: None,
        }];
        let encoded = encode_items(&lines).unwrap();
        assert!(encoded.starts_with('['));

        let order: Order = serde_json::from_value(json!({
            "order_number": "MC-2026-123456",
            "uid": "u1",
            "customer_name": "Ada",
            "customer_email": "ada@example.com",
            "customer_phone": "08030000000",
            "items": encoded,
            "address": "1 Marina",
            "city": "Lagos Island",
            "state": "Lagos",
            "payment_method": "cash_on_delivery",
            "subtotal": 6000,
            "total": 8500
        }))
        .unwrap();

        assert_eq!(order.line_items().unwrap(), lines);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.status, OrderStatus::Processing);
    }

    #[test]
    fn test_wishlist_outcome_wire_shape() {
        assert_eq!(
            serde_json::to_value(WishlistAddOutcome::AlreadyExists).unwrap(),
            json!({"action": "already_exists"})
        );
        assert_eq!(
            serde_json::to_value(CartAddOutcome { action: CartAction::Updated, quantity: 3 }).unwrap(),
            json!({"action": "updated", "quantity": 3})
        );
    }

    #[test]
    fn test_review_summary() {
        let review = |rating| Review {
            id: None,
            uid: "u".into(),
            product_id: "p".into(),
            user_name: "Bola".into(),
            rating,
            comment: String::new(),
            verified: false,
            created_at: None,
        };
        let summary = ReviewSummary::from_reviews(&[review(5), review(4), review(3)]);
        assert_eq!(summary.count, 3);
        assert!((summary.average - 4.0).abs() < f64::EPSILON);
        assert_eq!(ReviewSummary::from_reviews(&[]).count, 0);
    }

    #[test]
    fn test_decremented_stock_never_negative() {
        assert_eq!(decremented_stock(5, 1), 4);
        assert_eq!(decremented_stock(2, 3), 0);
        assert_eq!(decremented_stock(0, 10), 0);
    }
}
