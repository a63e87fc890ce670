//! Workflow tests against the in-memory backend.

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde_json::json;
use std::sync::Arc;

use storefront_core::order_number::parse_order_number;
use storefront_core::{
    cart_subtotal, CartAction, Money, OrderStatus, PaymentMethod, PaymentStatus, Product,
    WishlistAddOutcome,
};
use storefront_data::testing::MemoryGateway;
use storefront_data::{Backend, Method, UpsertStrategy};
use storefront_services::config::ReconcilerSettings;
use storefront_services::{
    CustomerDetails, DeliveryDetails, ErrorCode, OrderRequest, PaymentSdk, SdkLoader,
    StockReconciler, StoreConfig, StoreError, StoreResult, Storefront,
};

// =============================================================================
// Fixtures
// =============================================================================

struct NoSdk;

#[async_trait]
impl SdkLoader for NoSdk {
    async fn load(&self) -> StoreResult<Arc<dyn PaymentSdk>> {
        Err(StoreError::payment("payment popup unavailable in tests"))
    }
}

fn storefront(strategy: UpsertStrategy) -> (Storefront, Arc<MemoryGateway>) {
    let gateway = Arc::new(MemoryGateway::new());
    gateway.seed(
        "products",
        vec![
            json!({"id": "p1", "name": "Adire Scarf", "price": 8500, "stock": 5, "is_active": true}),
            json!({"id": "p2", "title": "Shea Butter 500g", "price": 3000, "promo_price": 2500,
                   "stock": 2, "is_active": true}),
            json!({"id": "p3", "name": "Gift Wrap", "price": 500, "stock": null, "is_active": true}),
        ],
    );

    let backend = Backend::new(gateway.clone()).with_upsert_strategy(strategy);
    let store = Storefront::with_backend(backend, &StoreConfig::default(), Arc::new(NoSdk));
    (store, gateway)
}

async fn product(store: &Storefront, id: &str) -> Product {
    store.product(id).await.into_value().expect("seeded product")
}

fn stock_of(gateway: &MemoryGateway, id: &str) -> serde_json::Value {
    gateway.find("products", "id", id).expect("product row")["stock"].clone()
}

async fn order_from_cart(store: &Storefront, uid: &str, method: PaymentMethod, reference: Option<&str>) -> OrderRequest {
    let items = store.cart_items(uid).await.into_value();
    let subtotal = cart_subtotal(&items);
    let delivery_fee = Money::from_naira(2_000);

    OrderRequest {
        uid: uid.to_string(),
        customer: CustomerDetails {
            name: "Ada Obi".to_string(),
            email: "ada@example.com".to_string(),
            phone: "08031234567".to_string(),
        },
        delivery: DeliveryDetails {
            address: "12 Admiralty Way".to_string(),
            city: "Lekki".to_string(),
            state: "Lagos".to_string(),
            notes: Some("Call on arrival".to_string()),
        },
        items: items.iter().map(|i| i.to_order_line()).collect(),
        subtotal,
        delivery_fee,
        total: subtotal + delivery_fee,
        payment_method: method,
        payment_reference: reference.map(String::from),
    }
}

// =============================================================================
// Order Placement
// =============================================================================

#[tokio::test]
async fn test_end_to_end_order() {
    let (store, gateway) = storefront(UpsertStrategy::Native);
    let p1 = product(&store, "p1").await;
    let p2 = product(&store, "p2").await;

    store.add_to_cart("u1", &p1, 1).await.unwrap();
    store.add_to_cart("u1", &p2, 3).await.unwrap();

    let request = order_from_cart(&store, "u1", PaymentMethod::Paystack, Some("MC_1760000000000_482913")).await;
    let placed = store.place_order(request).await.unwrap();

    assert_eq!(stock_of(&gateway, "p1"), 4);
    assert_eq!(stock_of(&gateway, "p2"), 0);
    assert_eq!(placed.stock.applied, 2);
    assert!(placed.stock.is_complete());

    assert!(store.cart_items("u1").await.into_value().is_empty());

    let orders = gateway.rows("orders");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["status"], "processing");
    assert_eq!(orders[0]["payment_status"], "paid");
    assert!(orders[0]["items"].is_string());

    let order = placed.order;
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    let (year, suffix) = parse_order_number(&order.order_number).unwrap();
    assert_eq!(year, Utc::now().year());
    assert!((100_000..=999_999).contains(&suffix));

    // Promo price was locked into the cart line and carried to the order.
    let lines = order.line_items().unwrap();
    assert_eq!(lines[1].price, Money::from_naira(2_500));
    assert_eq!(order.subtotal, Money::from_naira(8_500 + 3 * 2_500));
}

#[tokio::test]
async fn test_cod_order_is_pending_and_untracked_stock_is_skipped() {
    let (store, gateway) = storefront(UpsertStrategy::Native);
    let p1 = product(&store, "p1").await;
    let p3 = product(&store, "p3").await;

    store.add_to_cart("u1", &p1, 1).await.unwrap();
    store.add_to_cart("u1", &p3, 2).await.unwrap();

    let request = order_from_cart(&store, "u1", PaymentMethod::CashOnDelivery, None).await;
    let placed = store.place_order(request).await.unwrap();

    assert_eq!(placed.order.payment_status, PaymentStatus::Pending);
    assert_eq!(placed.stock.applied, 1);
    assert_eq!(placed.stock.untracked, 1);
    assert!(stock_of(&gateway, "p3").is_null());
}

#[tokio::test]
async fn test_cod_outside_window_rejected_before_any_write() {
    let (store, gateway) = storefront(UpsertStrategy::Native);
    let p1 = product(&store, "p1").await;
    store.add_to_cart("u1", &p1, 6).await.unwrap();

    let request = order_from_cart(&store, "u1", PaymentMethod::CashOnDelivery, None).await;
    let before = gateway.request_count();

    let err = store.place_order(request).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::ValidationError);
    assert!(err.message.contains("Cash on delivery"));
    assert_eq!(gateway.request_count(), before);
    assert!(gateway.rows("orders").is_empty());
}

#[tokio::test]
async fn test_negative_line_rejected_before_any_write() {
    let (store, gateway) = storefront(UpsertStrategy::Native);
    let p1 = product(&store, "p1").await;
    store.add_to_cart("u1", &p1, 1).await.unwrap();

    let mut request = order_from_cart(&store, "u1", PaymentMethod::Paystack, None).await;
    request.items[0].quantity = -10;
    let before = gateway.request_count();

    let err = store.place_order(request).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::ValidationError);
    assert_eq!(gateway.request_count(), before);
    assert!(gateway.rows("orders").is_empty());
    assert_eq!(stock_of(&gateway, "p1"), 5);
}

#[tokio::test]
async fn test_insert_failure_is_generic_and_touches_nothing() {
    let (store, gateway) = storefront(UpsertStrategy::Native);
    let p1 = product(&store, "p1").await;
    store.add_to_cart("u1", &p1, 1).await.unwrap();
    gateway.fail("orders", Method::Post, 500);

    let request = order_from_cart(&store, "u1", PaymentMethod::Paystack, None).await;
    let err = store.place_order(request).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::OrderFailed);
    assert!(!err.message.contains("500"));
    assert_eq!(store.cart_items("u1").await.into_value().len(), 1);
    assert_eq!(stock_of(&gateway, "p1"), 5);
}

#[tokio::test]
async fn test_cart_clear_failure_does_not_fail_order() {
    let (store, gateway) = storefront(UpsertStrategy::Native);
    let p1 = product(&store, "p1").await;
    store.add_to_cart("u1", &p1, 2).await.unwrap();
    gateway.fail("cart", Method::Delete, 503);

    let request = order_from_cart(&store, "u1", PaymentMethod::Paystack, None).await;
    let placed = store.place_order(request).await.unwrap();

    assert_eq!(placed.stock.applied, 1);
    assert_eq!(stock_of(&gateway, "p1"), 3);
    assert_eq!(store.cart_items("u1").await.into_value().len(), 1);
}

#[tokio::test]
async fn test_failed_decrement_is_queued_then_reconciled() {
    let (store, gateway) = storefront(UpsertStrategy::Native);
    let p1 = product(&store, "p1").await;
    let p2 = product(&store, "p2").await;
    store.add_to_cart("u1", &p1, 1).await.unwrap();
    store.add_to_cart("u1", &p2, 1).await.unwrap();
    gateway.fail_matching("products", Method::Patch, "id", "p2", 503);

    let request = order_from_cart(&store, "u1", PaymentMethod::Paystack, None).await;
    let placed = store.place_order(request).await.unwrap();

    assert_eq!(placed.stock.applied, 1);
    assert_eq!(placed.stock.queued, 1);
    assert_eq!(stock_of(&gateway, "p1"), 4);
    assert_eq!(stock_of(&gateway, "p2"), 2);

    let queued = gateway.rows("stock_adjustments");
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0]["product_id"], "p2");
    assert_eq!(queued[0]["order_number"], placed.order.order_number.as_str());

    gateway.heal();
    let (reconciler, _handle) = StockReconciler::new(store.backend().clone(), ReconcilerSettings::default());
    let summary = reconciler.reconcile_once().await.unwrap();

    assert_eq!(summary.applied, 1);
    assert_eq!(stock_of(&gateway, "p2"), 1);
    assert_eq!(store.backend().stock_adjustments().count_pending().await.into_value(), 0);
}

#[tokio::test]
async fn test_lost_adjustment_still_places_order() {
    let (store, gateway) = storefront(UpsertStrategy::Native);
    let p1 = product(&store, "p1").await;
    store.add_to_cart("u1", &p1, 1).await.unwrap();
    gateway.fail("products", Method::Patch, 503);
    gateway.fail("stock_adjustments", Method::Post, 503);

    let request = order_from_cart(&store, "u1", PaymentMethod::Paystack, None).await;
    let placed = store.place_order(request).await.unwrap();

    assert_eq!(placed.stock.lost, 1);
    assert!(!placed.stock.is_complete());
    assert_eq!(gateway.rows("orders").len(), 1);
}

// =============================================================================
// Cart & Wishlist Convergence
// =============================================================================

#[tokio::test]
async fn test_sequential_adds_accumulate() {
    for strategy in [UpsertStrategy::Native, UpsertStrategy::Serialized] {
        let (store, gateway) = storefront(strategy);
        let p1 = product(&store, "p1").await;

        let first = store.add_to_cart("u1", &p1, 2).await.unwrap();
        let second = store.add_to_cart("u1", &p1, 3).await.unwrap();

        assert_eq!(first.action, CartAction::Added);
        assert_eq!(second.action, CartAction::Updated);
        assert_eq!(second.quantity, 5);

        let rows = gateway.rows("cart");
        assert_eq!(rows.len(), 1, "{:?}", strategy);
        assert_eq!(rows[0]["quantity"], 5);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_converge() {
    for strategy in [UpsertStrategy::Native, UpsertStrategy::Serialized] {
        let (store, gateway) = storefront(strategy);
        let p1 = product(&store, "p1").await;
        let backend = store.backend().clone();

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..12 {
            let backend = backend.clone();
            let p1 = p1.clone();
            tasks.spawn(async move { backend.cart().add("u1", &p1, 1).await });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        let rows = gateway.rows("cart");
        assert_eq!(rows.len(), 1, "{:?}", strategy);
        assert_eq!(rows[0]["quantity"], 12, "{:?}", strategy);
    }
}

#[tokio::test]
async fn test_wishlist_duplicate_is_noop() {
    for strategy in [UpsertStrategy::Native, UpsertStrategy::Serialized] {
        let (store, gateway) = storefront(strategy);
        let p2 = product(&store, "p2").await;

        assert_eq!(store.add_to_wishlist("u1", &p2).await.unwrap(), WishlistAddOutcome::Added);
        assert_eq!(
            store.add_to_wishlist("u1", &p2).await.unwrap(),
            WishlistAddOutcome::AlreadyExists
        );
        assert_eq!(gateway.rows("wishlist").len(), 1, "{:?}", strategy);
    }
}

#[tokio::test]
async fn test_move_to_cart() {
    let (store, _) = storefront(UpsertStrategy::Native);
    let p2 = product(&store, "p2").await;
    store.add_to_wishlist("u1", &p2).await.unwrap();

    let outcome = store.move_to_cart("u1", &p2).await.unwrap();

    assert_eq!(outcome.quantity, 1);
    assert!(!store.in_wishlist("u1", "p2").await.into_value());
    assert_eq!(store.cart_count("u1").await.into_value(), 1);
}

#[tokio::test]
async fn test_update_to_zero_removes_line() {
    let (store, gateway) = storefront(UpsertStrategy::Native);
    let p1 = product(&store, "p1").await;
    store.add_to_cart("u1", &p1, 2).await.unwrap();

    store.update_cart_item("u1", "p1", 4).await.unwrap();
    assert_eq!(gateway.rows("cart")[0]["quantity"], 4);

    store.update_cart_item("u1", "p1", 0).await.unwrap();
    assert!(gateway.rows("cart").is_empty());
}

#[tokio::test]
async fn test_cart_write_failure_has_cart_code() {
    let (store, gateway) = storefront(UpsertStrategy::Native);
    let p1 = product(&store, "p1").await;
    store.add_to_cart("u1", &p1, 1).await.unwrap();

    gateway.fail("cart", Method::Patch, 503);
    let err = store.update_cart_item("u1", "p1", 3).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::CartError);
    assert!(!err.message.contains("503"));
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn test_failed_read_is_tagged_degraded() {
    let (store, gateway) = storefront(UpsertStrategy::Native);
    let p1 = product(&store, "p1").await;
    store.add_to_cart("u1", &p1, 1).await.unwrap();

    gateway.fail("cart", Method::Get, 503);
    let items = store.cart_items("u1").await;
    assert!(items.is_degraded());
    assert!(items.value().is_empty());

    gateway.heal();
    let items = store.cart_items("u1").await;
    assert!(!items.is_degraded());
    assert_eq!(items.value().len(), 1);
}

#[tokio::test]
async fn test_verification_needs_secret_key() {
    let (store, _) = storefront(UpsertStrategy::Native);
    let err = store.verify_payment("MC_1_123456", Money::from_naira(1_000)).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigError);
}
