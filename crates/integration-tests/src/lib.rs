//! Integration tests for Bazaar.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! ```
//!
//! Scenarios run whole sessions against the in-memory backend, so no store
//! or network is needed. [`TestContext`] wires a seeded
//! [`MemoryBackend`] into an [`AppState`] with a signed-in shopper.
//!
//! # Test Categories
//!
//! - `session_cart` - cart and pricing through a session
//! - `session_checkout` - drafts, submission, retry and buy-now
//! - `session_wishlist` - favorites, races and rollback
//! - `addresses` - the address book

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use bazaar_core::{Email, Money, Product, ProductId, ShippingAddress, UserId};
use bazaar_storefront::backend::MemoryBackend;
use bazaar_storefront::cart::PricingPolicy;
use bazaar_storefront::models::session::CurrentUser;
use bazaar_storefront::{AppState, Services, Session};

/// Request timeout used by test sessions.
pub const TIMEOUT: Duration = Duration::from_secs(2);

/// A seeded backend and the state built on it.
pub struct TestContext {
    pub backend: Arc<MemoryBackend>,
    pub state: AppState,
}

impl TestContext {
    /// Seeded catalog, shopper signed in, default pricing.
    #[must_use]
    pub fn new() -> Self {
        Self::build(MemoryBackend::new(), PricingPolicy::default())
    }

    /// Same as [`TestContext::new`] with a custom policy.
    #[must_use]
    pub fn with_policy(policy: PricingPolicy) -> Self {
        Self::build(MemoryBackend::new(), policy)
    }

    /// Same as [`TestContext::new`] with every store call delayed.
    #[must_use]
    pub fn with_latency(latency: Duration) -> Self {
        Self::build(
            MemoryBackend::new().with_latency(latency),
            PricingPolicy::default(),
        )
    }

    /// Catalog seeded but nobody signed in.
    #[must_use]
    pub fn signed_out() -> Self {
        let ctx = Self::new();
        ctx.backend.sign_out();
        ctx
    }

    fn build(backend: MemoryBackend, policy: PricingPolicy) -> Self {
        let backend = Arc::new(backend.with_user(shopper()));
        seed_catalog(&backend);
        let services = Services::from_backend(&backend, backend.clone());
        let state = AppState::new(services, policy, TIMEOUT);
        Self { backend, state }
    }

    /// Start a session for the signed-in shopper.
    ///
    /// # Panics
    ///
    /// Panics if the session cannot start.
    #[allow(clippy::expect_used)]
    pub async fn session(&self) -> Session {
        Session::start(self.state.clone())
            .await
            .expect("session should start")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// The signed-in test shopper.
///
/// # Panics
///
/// Never; the email literal is valid.
#[must_use]
#[allow(clippy::expect_used)]
pub fn shopper() -> CurrentUser {
    CurrentUser {
        id: UserId::new("shopper-1"),
        email: Email::parse("shopper@bazaar.test").expect("valid email"),
        display_name: Some("Test Shopper".to_string()),
    }
}

/// A complete shipping address.
#[must_use]
pub fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Sam Rivera".to_string(),
        street: "400 Market Street".to_string(),
        city: "Springfield".to_string(),
        region: "IL".to_string(),
        postal_code: "62701".to_string(),
        country: "US".to_string(),
        phone: "+1 217 555 0100".to_string(),
    }
}

/// Catalog product IDs seeded by every context.
pub mod ids {
    pub const HEADPHONES: &str = "headphones";
    pub const WATCH: &str = "watch";
    pub const COFFEE_MAKER: &str = "coffee-maker";
    pub const SHOES: &str = "shoes";
    pub const MUG: &str = "mug";
    pub const TEA: &str = "tea";
    pub const SOLD_OUT: &str = "sold-out";
}

#[must_use]
pub fn pid(id: &str) -> ProductId {
    ProductId::new(id)
}

#[allow(clippy::expect_used)]
fn product(id: &str, name: &str, category: &str, price: Decimal, original: Decimal) -> Product {
    Product::new(id, name, category, Money::new(price))
        .and_then(|p| p.with_original_price(Money::new(original)))
        .expect("seed product is valid")
}

fn seed_catalog(backend: &MemoryBackend) {
    use ids::{COFFEE_MAKER, HEADPHONES, MUG, SHOES, SOLD_OUT, TEA, WATCH};

    for p in [
        product(HEADPHONES, "Wireless Bluetooth Headphones", "Electronics", dec!(89.99), dec!(129.99)),
        product(WATCH, "Smart Fitness Watch", "Electronics", dec!(199.99), dec!(249.99)),
        product(COFFEE_MAKER, "Premium Coffee Maker", "Home & Garden", dec!(149.99), dec!(199.99)),
        product(SHOES, "Running Shoes", "Sports & Outdoors", dec!(79.99), dec!(99.99)),
        product(MUG, "Stoneware Mug", "Home & Garden", dec!(10.00), dec!(10.00)),
        product(TEA, "Loose Leaf Tea", "Home & Garden", dec!(5.00), dec!(5.00)),
        product(SOLD_OUT, "Limited Print", "Home & Garden", dec!(40.00), dec!(40.00))
            .with_stock(false),
    ] {
        backend.insert_product(p);
    }
}
