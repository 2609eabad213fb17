//! Remote service seams.
//!
//! The storefront consumes the catalog, wishlist, order, address book and
//! auth stores through these traits. Implementations live in
//! [`crate::backend`]; the engine only ever sees `Arc<dyn ...>` handles.
//!
//! Every call made by the engine goes through [`timed`] so that a hung store
//! surfaces as [`RemoteError::Timeout`] instead of stalling the session.

mod auth;

use std::cmp::Ordering;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bazaar_core::{
    AddressId, Order, OrderId, Product, ProductId, SavedAddress, ShippingAddress, UserId,
    WishlistEntry, WishlistEntryId,
};

use crate::backend::RemoteError;
use crate::checkout::OrderDraft;

pub use auth::{AuthService, StaticAuth};

/// Read access to the product catalog.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Fetch a product by ID, `None` if it does not exist.
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, RemoteError>;

    /// Fetch a product bypassing any read cache.
    ///
    /// Used where stale data is not acceptable, such as the stock check at
    /// checkout. Defaults to [`CatalogService::get_product`].
    async fn refresh_product(&self, id: &ProductId) -> Result<Option<Product>, RemoteError> {
        self.get_product(id).await
    }

    /// Products in a category, newest first.
    async fn list_by_category(
        &self,
        category: &str,
        limit: usize,
    ) -> Result<Vec<Product>, RemoteError>;

    /// Products whose name starts with `prefix` (case-sensitive), by name.
    async fn search_by_name_prefix(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<Product>, RemoteError>;

    /// Newest products across all categories, one page of the home feed.
    ///
    /// Pass the cursor of the previous page's last product to continue
    /// after it; `None` starts from the newest product.
    async fn list_recent(
        &self,
        limit: usize,
        after: Option<&FeedCursor>,
    ) -> Result<Vec<Product>, RemoteError>;
}

/// Position in the home feed, taken from the last product of a page.
///
/// Feed order is newest first, undated products last, ties broken by
/// product ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedCursor {
    pub created_at: Option<DateTime<Utc>>,
    pub id: ProductId,
}

impl FeedCursor {
    /// The cursor pointing just past `product`.
    #[must_use]
    pub fn after(product: &Product) -> Self {
        Self {
            created_at: product.created_at(),
            id: product.id().clone(),
        }
    }

    /// Whether `product` comes after this position in feed order.
    #[must_use]
    pub fn precedes(&self, product: &Product) -> bool {
        self.created_at
            .cmp(&product.created_at())
            .then_with(|| product.id().cmp(&self.id))
            == Ordering::Greater
    }
}

/// The per-user favorites store.
#[async_trait]
pub trait WishlistService: Send + Sync {
    async fn list(&self, user_id: &UserId) -> Result<Vec<WishlistEntry>, RemoteError>;

    /// Persist a new favorite and return its store-assigned ID.
    async fn add(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<WishlistEntryId, RemoteError>;

    async fn remove(&self, entry_id: &WishlistEntryId) -> Result<(), RemoteError>;
}

/// The append-only order store.
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Persist a draft with status `pending` and return the new order ID.
    ///
    /// Not idempotent: submitting the same draft twice creates two orders
    /// unless the store deduplicates.
    async fn create(&self, draft: &OrderDraft) -> Result<OrderId, RemoteError>;

    /// Orders placed by a user, newest first.
    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Order>, RemoteError>;

    async fn get(&self, order_id: &OrderId) -> Result<Option<Order>, RemoteError>;
}

/// The user's saved shipping addresses.
#[async_trait]
pub trait AddressService: Send + Sync {
    /// Saved addresses, default first.
    async fn list(&self, user_id: &UserId) -> Result<Vec<SavedAddress>, RemoteError>;

    async fn add(
        &self,
        user_id: &UserId,
        address: &ShippingAddress,
        is_default: bool,
    ) -> Result<AddressId, RemoteError>;

    async fn update(
        &self,
        address_id: &AddressId,
        address: &ShippingAddress,
    ) -> Result<(), RemoteError>;

    async fn remove(&self, address_id: &AddressId) -> Result<(), RemoteError>;
}

/// Run a remote call with an upper bound on its duration.
///
/// # Errors
///
/// Returns `RemoteError::Timeout` if `limit` elapses first, otherwise the
/// call's own result.
pub async fn timed<T, F>(limit: Duration, call: F) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
        tracing::warn!(timeout_ms = limit.as_millis(), "Remote call timed out");
        Err(RemoteError::Timeout(limit))
    })
}
