//! Application state shared across sessions.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::{RemoteError, RestBackend};
use crate::cart::{Cart, PricingPolicy};
use crate::checkout::Checkout;
use crate::config::StorefrontConfig;
use crate::services::{
    AddressService, AuthService, CatalogService, OrderService, WishlistService,
};
use crate::wishlist::Wishlist;

/// Handles to the remote stores.
#[derive(Clone)]
pub struct Services {
    pub catalog: Arc<dyn CatalogService>,
    pub wishlist: Arc<dyn WishlistService>,
    pub orders: Arc<dyn OrderService>,
    pub addresses: Arc<dyn AddressService>,
    pub auth: Arc<dyn AuthService>,
}

impl Services {
    /// Use one backend for every store, with a separate auth source.
    pub fn from_backend<B>(backend: &Arc<B>, auth: Arc<dyn AuthService>) -> Self
    where
        B: CatalogService + WishlistService + OrderService + AddressService + 'static,
    {
        Self {
            catalog: backend.clone(),
            wishlist: backend.clone(),
            orders: backend.clone(),
            addresses: backend.clone(),
            auth,
        }
    }
}

/// Application state shared across all sessions.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// remote stores, the pricing policy and the request timeout.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    services: Services,
    policy: PricingPolicy,
    request_timeout: Duration,
}

impl AppState {
    #[must_use]
    pub fn new(services: Services, policy: PricingPolicy, request_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                services,
                policy,
                request_timeout,
            }),
        }
    }

    /// Create state backed by the REST gateway described in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(
        config: &StorefrontConfig,
        auth: Arc<dyn AuthService>,
    ) -> Result<Self, RemoteError> {
        let backend = Arc::new(RestBackend::new(&config.backend, config.request_timeout)?);
        tracing::info!(backend_url = %config.backend.base_url, "Using REST backend");
        Ok(Self::new(
            Services::from_backend(&backend, auth),
            config.pricing,
            config.request_timeout,
        ))
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn CatalogService> {
        &self.inner.services.catalog
    }

    #[must_use]
    pub fn orders(&self) -> &Arc<dyn OrderService> {
        &self.inner.services.orders
    }

    #[must_use]
    pub fn addresses(&self) -> &Arc<dyn AddressService> {
        &self.inner.services.addresses
    }

    #[must_use]
    pub fn auth(&self) -> &Arc<dyn AuthService> {
        &self.inner.services.auth
    }

    /// The shipping and tax policy applied to every cart and draft.
    #[must_use]
    pub fn policy(&self) -> PricingPolicy {
        self.inner.policy
    }

    /// Upper bound on every remote call.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.inner.request_timeout
    }

    /// An empty cart priced with the shared policy.
    #[must_use]
    pub fn new_cart(&self) -> Cart {
        Cart::new(self.inner.policy)
    }

    /// An empty wishlist cache over the shared wishlist store.
    #[must_use]
    pub fn new_wishlist(&self) -> Wishlist {
        Wishlist::new(
            self.inner.services.wishlist.clone(),
            self.inner.request_timeout,
        )
    }

    #[must_use]
    pub fn checkout(&self) -> Checkout {
        Checkout::new(
            self.inner.services.catalog.clone(),
            self.inner.services.orders.clone(),
            self.inner.policy,
            self.inner.request_timeout,
        )
    }
}
