//! # Storefront Facade
//!
//! One handle for the pages. Reads come back as [`Fetched`] and never fail;
//! writes return [`StoreResult`] with messages safe to show.

use std::sync::Arc;
use tracing::debug;

use crate::checkout::{Checkout, OrderRequest, PlacedOrder};
use crate::config::StoreConfig;
use crate::error::{ErrorCode, StoreError, StoreResult};
use crate::payment::{
    validate_cash_on_delivery, PaymentDetails, PaymentHandler, PaymentInitiator, PaymentReceipt,
    PaystackVerifier, SdkLoader,
};
use crate::session::SessionStore;
use crate::shipping::ShippingResolver;
use storefront_core::shipping::{RateQuote, RateRequest};
use storefront_core::validation::{validate_quantity, validate_uid};
use storefront_core::{
    CartAddOutcome, CartItem, Money, Order, Product, Review, ReviewSummary, WishlistAddOutcome,
    WishlistItem,
};
use storefront_data::{Backend, DataError, Fetched};

/// Default page size for product listings.
pub const PRODUCT_PAGE_SIZE: u32 = 48;

/// Backend failures on cart writes get the cart-specific code.
fn cart_error(err: DataError) -> StoreError {
    let err = StoreError::from(err);
    if err.code == ErrorCode::RemoteError {
        StoreError::new(ErrorCode::CartError, "We could not update your cart. Please try again.")
    } else {
        err
    }
}

pub struct Storefront {
    backend: Backend,
    checkout: Checkout,
    shipping: ShippingResolver,
    payments: PaymentInitiator,
    verifier: Option<PaystackVerifier>,
    session: SessionStore,
}

impl Storefront {
    /// Builds every service from loaded configuration.
    pub fn from_config(config: &StoreConfig, sdk_loader: Arc<dyn SdkLoader>) -> Self {
        let backend = Backend::http(config.gateway_config()).with_upsert_strategy(config.upsert_strategy());
        Self::with_backend(backend, config, sdk_loader)
    }

    /// Uses an existing backend handle (tests, shared gateways).
    pub fn with_backend(backend: Backend, config: &StoreConfig, sdk_loader: Arc<dyn SdkLoader>) -> Self {
        let verifier = match PaystackVerifier::new(&config.payment) {
            Ok(v) => Some(v),
            Err(e) => {
                debug!("Payment verification disabled: {}", e);
                None
            }
        };

        Storefront {
            checkout: Checkout::new(backend.clone()),
            shipping: ShippingResolver::new(&config.shipping),
            payments: PaymentInitiator::new(&config.payment, sdk_loader),
            verifier,
            session: SessionStore::new(backend.users()),
            backend,
        }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    // =========================================================================
    // Catalogue
    // =========================================================================

    pub async fn products(&self) -> Fetched<Vec<Product>> {
        self.backend.products().list_active(PRODUCT_PAGE_SIZE).await
    }

    pub async fn product(&self, id: &str) -> Fetched<Option<Product>> {
        self.backend.products().get(id).await
    }

    pub async fn search_products(&self, term: &str) -> Fetched<Vec<Product>> {
        self.backend.products().search(term, PRODUCT_PAGE_SIZE).await
    }

    pub async fn products_in_category(&self, category: &str) -> Fetched<Vec<Product>> {
        self.backend.products().by_category(category, PRODUCT_PAGE_SIZE).await
    }

    // =========================================================================
    // Cart
    // =========================================================================

    pub async fn add_to_cart(&self, uid: &str, product: &Product, quantity: i64) -> StoreResult<CartAddOutcome> {
        validate_uid(uid)?;
        if !product.is_active {
            return Err(StoreError::validation(format!("{} is no longer available", product.name)));
        }
        self.backend.cart().add(uid, product, quantity).await.map_err(cart_error)
    }

    /// Sets a line's quantity; zero or less removes it.
    pub async fn update_cart_item(&self, uid: &str, product_id: &str, quantity: i64) -> StoreResult<()> {
        validate_uid(uid)?;
        if quantity > 0 {
            validate_quantity(quantity)?;
        }
        self.backend
            .cart()
            .update_quantity(uid, product_id, quantity)
            .await
            .map_err(cart_error)
    }

    pub async fn remove_from_cart(&self, uid: &str, product_id: &str) -> StoreResult<()> {
        validate_uid(uid)?;
        self.backend.cart().remove(uid, product_id).await.map_err(cart_error)
    }

    pub async fn cart_items(&self, uid: &str) -> Fetched<Vec<CartItem>> {
        self.backend.cart().items(uid).await
    }

    /// Units in the cart, for the header badge.
    pub async fn cart_count(&self, uid: &str) -> Fetched<i64> {
        self.backend.cart().count(uid).await
    }

    pub async fn cart_subtotal(&self, uid: &str) -> Fetched<Money> {
        self.backend.cart().subtotal(uid).await
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    pub async fn add_to_wishlist(&self, uid: &str, product: &Product) -> StoreResult<WishlistAddOutcome> {
        validate_uid(uid)?;
        Ok(self.backend.wishlist().add(uid, product).await?)
    }

    pub async fn remove_from_wishlist(&self, uid: &str, product_id: &str) -> StoreResult<()> {
        validate_uid(uid)?;
        Ok(self.backend.wishlist().remove(uid, product_id).await?)
    }

    pub async fn wishlist_items(&self, uid: &str) -> Fetched<Vec<WishlistItem>> {
        self.backend.wishlist().items(uid).await
    }

    pub async fn in_wishlist(&self, uid: &str, product_id: &str) -> Fetched<bool> {
        self.backend.wishlist().contains(uid, product_id).await
    }

    /// Adds one unit to the cart, then drops the wishlist entry.
    ///
    /// If the cart write fails the wishlist is left alone.
    pub async fn move_to_cart(&self, uid: &str, product: &Product) -> StoreResult<CartAddOutcome> {
        let outcome = self.add_to_cart(uid, product, 1).await?;
        self.backend.wishlist().remove(uid, &product.id).await?;
        debug!(uid = %uid, product_id = %product.id, "Moved wishlist item to cart");
        Ok(outcome)
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    pub async fn reviews(&self, product_id: &str) -> Fetched<Vec<Review>> {
        self.backend.reviews().for_product(product_id).await
    }

    pub async fn review_summary(&self, product_id: &str) -> Fetched<ReviewSummary> {
        self.backend.reviews().summary(product_id).await
    }

    pub async fn add_review(&self, review: &Review) -> StoreResult<Review> {
        validate_uid(&review.uid)?;
        Ok(self.backend.reviews().add(review).await?)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    pub async fn place_order(&self, request: OrderRequest) -> StoreResult<PlacedOrder> {
        self.checkout.place_order(request).await
    }

    pub async fn orders(&self, uid: &str) -> Fetched<Vec<Order>> {
        self.backend.orders().for_user(uid).await
    }

    pub async fn order_by_number(&self, order_number: &str) -> Fetched<Option<Order>> {
        self.backend.orders().by_number(order_number).await
    }

    // =========================================================================
    // Shipping & Payment
    // =========================================================================

    pub async fn shipping_rates(&self, request: &RateRequest) -> RateQuote {
        self.shipping.get_rates(request).await
    }

    pub async fn pay(&self, details: PaymentDetails, handler: &dyn PaymentHandler) -> StoreResult<String> {
        self.payments.pay(details, handler).await
    }

    pub fn check_cash_on_delivery(&self, total: Money) -> StoreResult<()> {
        validate_cash_on_delivery(total)
    }

    /// Confirms a card payment with the provider.
    pub async fn verify_payment(&self, reference: &str, expected: Money) -> StoreResult<PaymentReceipt> {
        match &self.verifier {
            Some(verifier) => verifier.verify(reference, expected).await,
            None => Err(StoreError::new(
                ErrorCode::ConfigError,
                "Payment verification is not configured",
            )),
        }
    }
}
