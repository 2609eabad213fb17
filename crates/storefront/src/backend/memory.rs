//! In-process backend.
//!
//! Holds every collection in memory behind `parking_lot` locks. Used by the
//! test suites and for offline demos. Besides the service traits it offers
//! knobs to make the store misbehave:
//!
//! - [`MemoryBackend::with_latency`] delays every service call
//! - [`MemoryBackend::fail_next_wishlist_writes`] and
//!   [`MemoryBackend::fail_next_order_creates`] reject the next N writes
//! - call counters ([`MemoryBackend::wishlist_adds`] and friends)

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use bazaar_core::{
    AddressId, Order, OrderId, Product, ProductId, SavedAddress, ShippingAddress, UserId,
    WishlistEntry, WishlistEntryId,
};

use super::RemoteError;
use crate::checkout::OrderDraft;
use crate::models::session::CurrentUser;
use crate::services::{
    AddressService, AuthService, CatalogService, FeedCursor, OrderService, WishlistService,
};

#[derive(Debug, Default)]
struct Collections {
    products: HashMap<ProductId, Product>,
    wishlist: Vec<WishlistEntry>,
    orders: Vec<Order>,
    addresses: Vec<SavedAddress>,
}

#[derive(Debug, Default)]
struct FailurePlan {
    wishlist_writes: usize,
    order_creates: usize,
}

/// Take one planned failure from `remaining`, if any.
fn take_failure(remaining: &mut usize, what: &str) -> Result<(), RemoteError> {
    if *remaining == 0 {
        return Ok(());
    }
    *remaining -= 1;
    tracing::debug!(what, "Injected store failure");
    Err(RemoteError::Unavailable(format!("{what} rejected")))
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// A complete storefront backend held in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: RwLock<Collections>,
    user: RwLock<Option<CurrentUser>>,
    latency: Option<Duration>,
    failures: Mutex<FailurePlan>,
    catalog_reads: AtomicUsize,
    wishlist_adds: AtomicUsize,
    wishlist_removes: AtomicUsize,
    order_creates: AtomicUsize,
}

impl MemoryBackend {
    /// Create an empty backend with nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every service call by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Sign `user` in.
    #[must_use]
    pub fn with_user(self, user: CurrentUser) -> Self {
        *self.user.write() = Some(user);
        self
    }

    pub fn sign_in(&self, user: CurrentUser) {
        *self.user.write() = Some(user);
    }

    pub fn sign_out(&self) {
        self.user.write().take();
    }

    // =========================================================================
    // Seeding and inspection
    // =========================================================================

    /// Insert or replace a catalog product.
    pub fn insert_product(&self, product: Product) {
        self.data
            .write()
            .products
            .insert(product.id().clone(), product);
    }

    pub fn remove_product(&self, id: &ProductId) -> Option<Product> {
        self.data.write().products.remove(id)
    }

    /// Store a wishlist entry directly, without uniqueness checks or
    /// counting. Lets tests reproduce duplicates a real store may hold.
    pub fn seed_wishlist_entry(&self, user_id: &UserId, product_id: &ProductId) -> WishlistEntryId {
        let id = WishlistEntryId::new(new_id());
        self.data.write().wishlist.push(WishlistEntry {
            id: id.clone(),
            user_id: user_id.clone(),
            product_id: product_id.clone(),
            created_at: Utc::now(),
        });
        id
    }

    /// The stored wishlist entries of a user.
    #[must_use]
    pub fn wishlist_entries(&self, user_id: &UserId) -> Vec<WishlistEntry> {
        self.data
            .read()
            .wishlist
            .iter()
            .filter(|entry| &entry.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Delete a user's wishlist entries behind the engine's back.
    pub fn clear_wishlist(&self, user_id: &UserId) {
        self.data
            .write()
            .wishlist
            .retain(|entry| &entry.user_id != user_id);
    }

    /// Reject the next `count` wishlist adds or removes.
    pub fn fail_next_wishlist_writes(&self, count: usize) {
        self.failures.lock().wishlist_writes = count;
    }

    /// Reject the next `count` order creations.
    pub fn fail_next_order_creates(&self, count: usize) {
        self.failures.lock().order_creates = count;
    }

    /// Catalog lookups served so far.
    #[must_use]
    pub fn catalog_reads(&self) -> usize {
        self.catalog_reads.load(Ordering::Relaxed)
    }

    /// Successful wishlist adds so far.
    #[must_use]
    pub fn wishlist_adds(&self) -> usize {
        self.wishlist_adds.load(Ordering::Relaxed)
    }

    /// Successful wishlist removes so far.
    #[must_use]
    pub fn wishlist_removes(&self) -> usize {
        self.wishlist_removes.load(Ordering::Relaxed)
    }

    /// Orders persisted so far.
    #[must_use]
    pub fn order_creates(&self) -> usize {
        self.order_creates.load(Ordering::Relaxed)
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn read_products<F>(&self, filter: F, limit: usize) -> Vec<Product>
    where
        F: Fn(&Product) -> bool,
    {
        self.catalog_reads.fetch_add(1, Ordering::Relaxed);
        let data = self.data.read();
        let mut products: Vec<Product> = data
            .products
            .values()
            .filter(|p| filter(p))
            .cloned()
            .collect();
        // Newest first; undated products last, by ID for a stable order.
        products.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        products.truncate(limit);
        products
    }
}

// =============================================================================
// Service implementations
// =============================================================================

#[async_trait]
impl CatalogService for MemoryBackend {
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, RemoteError> {
        self.delay().await;
        self.catalog_reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.data.read().products.get(id).cloned())
    }

    async fn list_by_category(
        &self,
        category: &str,
        limit: usize,
    ) -> Result<Vec<Product>, RemoteError> {
        self.delay().await;
        Ok(self.read_products(|p| p.category() == category, limit))
    }

    async fn search_by_name_prefix(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<Product>, RemoteError> {
        self.delay().await;
        let mut products = self.read_products(|p| p.name().starts_with(prefix), usize::MAX);
        products.sort_by(|a, b| a.name().cmp(b.name()));
        products.truncate(limit);
        Ok(products)
    }

    async fn list_recent(
        &self,
        limit: usize,
        after: Option<&FeedCursor>,
    ) -> Result<Vec<Product>, RemoteError> {
        self.delay().await;
        Ok(self.read_products(|p| after.is_none_or(|cursor| cursor.precedes(p)), limit))
    }
}

#[async_trait]
impl WishlistService for MemoryBackend {
    async fn list(&self, user_id: &UserId) -> Result<Vec<WishlistEntry>, RemoteError> {
        self.delay().await;
        Ok(self.wishlist_entries(user_id))
    }

    async fn add(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<WishlistEntryId, RemoteError> {
        self.delay().await;
        take_failure(&mut self.failures.lock().wishlist_writes, "wishlist write")?;

        let mut data = self.data.write();
        // Unique per (user, product): hand back the existing entry.
        if let Some(existing) = data
            .wishlist
            .iter()
            .find(|e| &e.user_id == user_id && &e.product_id == product_id)
        {
            return Ok(existing.id.clone());
        }

        let id = WishlistEntryId::new(new_id());
        data.wishlist.push(WishlistEntry {
            id: id.clone(),
            user_id: user_id.clone(),
            product_id: product_id.clone(),
            created_at: Utc::now(),
        });
        self.wishlist_adds.fetch_add(1, Ordering::Relaxed);
        Ok(id)
    }

    async fn remove(&self, entry_id: &WishlistEntryId) -> Result<(), RemoteError> {
        self.delay().await;
        take_failure(&mut self.failures.lock().wishlist_writes, "wishlist write")?;

        let mut data = self.data.write();
        let before = data.wishlist.len();
        data.wishlist.retain(|e| &e.id != entry_id);
        if data.wishlist.len() == before {
            return Err(RemoteError::NotFound(format!("wishlist entry {entry_id}")));
        }
        self.wishlist_removes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[async_trait]
impl OrderService for MemoryBackend {
    async fn create(&self, draft: &OrderDraft) -> Result<OrderId, RemoteError> {
        self.delay().await;
        take_failure(&mut self.failures.lock().order_creates, "order create")?;

        let id = OrderId::new(new_id());
        self.data.write().orders.push(draft.to_order(id.clone()));
        self.order_creates.fetch_add(1, Ordering::Relaxed);
        Ok(id)
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Order>, RemoteError> {
        self.delay().await;
        let mut orders: Vec<Order> = self
            .data
            .read()
            .orders
            .iter()
            .rev()
            .filter(|o| &o.user_id == user_id)
            .cloned()
            .collect();
        // Stable sort over reversed storage: equal timestamps list the later
        // order first.
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn get(&self, order_id: &OrderId) -> Result<Option<Order>, RemoteError> {
        self.delay().await;
        Ok(self
            .data
            .read()
            .orders
            .iter()
            .find(|o| &o.id == order_id)
            .cloned())
    }
}

#[async_trait]
impl AddressService for MemoryBackend {
    async fn list(&self, user_id: &UserId) -> Result<Vec<SavedAddress>, RemoteError> {
        self.delay().await;
        let mut addresses: Vec<SavedAddress> = self
            .data
            .read()
            .addresses
            .iter()
            .filter(|a| &a.user_id == user_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order among non-defaults.
        addresses.sort_by_key(|a| !a.is_default);
        Ok(addresses)
    }

    async fn add(
        &self,
        user_id: &UserId,
        address: &ShippingAddress,
        is_default: bool,
    ) -> Result<AddressId, RemoteError> {
        self.delay().await;
        let mut data = self.data.write();
        if is_default {
            for saved in data.addresses.iter_mut().filter(|a| &a.user_id == user_id) {
                saved.is_default = false;
            }
        }

        let id = AddressId::new(new_id());
        data.addresses.push(SavedAddress {
            id: id.clone(),
            user_id: user_id.clone(),
            address: address.clone(),
            is_default,
            created_at: Some(Utc::now()),
        });
        Ok(id)
    }

    async fn update(
        &self,
        address_id: &AddressId,
        address: &ShippingAddress,
    ) -> Result<(), RemoteError> {
        self.delay().await;
        let mut data = self.data.write();
        let saved = data
            .addresses
            .iter_mut()
            .find(|a| &a.id == address_id)
            .ok_or_else(|| RemoteError::NotFound(format!("address {address_id}")))?;
        saved.address = address.clone();
        Ok(())
    }

    async fn remove(&self, address_id: &AddressId) -> Result<(), RemoteError> {
        self.delay().await;
        let mut data = self.data.write();
        let before = data.addresses.len();
        data.addresses.retain(|a| &a.id != address_id);
        if data.addresses.len() == before {
            return Err(RemoteError::NotFound(format!("address {address_id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthService for MemoryBackend {
    async fn current_user(&self) -> Result<Option<CurrentUser>, RemoteError> {
        Ok(self.user.read().clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::{Money, OrderStatus, OrderTotals, PaymentMethod};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use super::*;

    fn product(id: &str, name: &str, category: &str, day: u32) -> Product {
        Product::new(id, name, category, Money::new(dec!(1.00)))
            .unwrap()
            .with_created_at(Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap())
    }

    fn seeded() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.insert_product(product("1", "Kettle", "Kitchen", 1));
        backend.insert_product(product("2", "Knife", "Kitchen", 3));
        backend.insert_product(product("3", "Lamp", "Home", 2));
        backend.insert_product(product("4", "Keyboard", "Tech", 4));
        backend
    }

    fn ids(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.id().as_str()).collect()
    }

    #[tokio::test]
    async fn test_list_by_category_newest_first() {
        let backend = seeded();
        let kitchen = backend.list_by_category("Kitchen", 10).await.unwrap();
        assert_eq!(ids(&kitchen), ["2", "1"]);

        let limited = backend.list_by_category("Kitchen", 1).await.unwrap();
        assert_eq!(ids(&limited), ["2"]);
    }

    #[tokio::test]
    async fn test_prefix_search_is_case_sensitive_and_sorted() {
        let backend = seeded();
        let found = backend.search_by_name_prefix("K", 10).await.unwrap();
        assert_eq!(ids(&found), ["1", "4", "2"]);
        assert!(backend.search_by_name_prefix("k", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_recent() {
        let backend = seeded();
        let recent = backend.list_recent(2, None).await.unwrap();
        assert_eq!(ids(&recent), ["4", "2"]);

        let cursor = FeedCursor::after(&recent[1]);
        let next = backend.list_recent(2, Some(&cursor)).await.unwrap();
        assert_eq!(ids(&next), ["3", "1"]);

        let last = FeedCursor::after(&next[1]);
        assert!(backend.list_recent(2, Some(&last)).await.unwrap().is_empty());
    }

    fn order(id: &str, user: &str, day: u32) -> Order {
        let at = Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap();
        Order {
            id: OrderId::new(id),
            user_id: UserId::new(user),
            lines: Vec::new(),
            shipping_address: ShippingAddress::default(),
            payment_method: PaymentMethod::Card,
            totals: OrderTotals::default(),
            status: OrderStatus::Pending,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn test_orders_newest_first_with_ties() {
        let backend = MemoryBackend::new();
        {
            let mut data = backend.data.write();
            data.orders.push(order("a", "u", 2));
            data.orders.push(order("b", "u", 5));
            data.orders.push(order("c", "other", 9));
            data.orders.push(order("d", "u", 5));
        }

        let listed = backend.list_by_user(&UserId::new("u")).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["d", "b", "a"]);
    }

    #[tokio::test]
    async fn test_wishlist_add_is_unique_per_product() {
        let backend = MemoryBackend::new();
        let user = UserId::new("u");
        let p = ProductId::new("p");

        let first = WishlistService::add(&backend, &user, &p).await.unwrap();
        let second = WishlistService::add(&backend, &user, &p).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(backend.wishlist_entries(&user).len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let backend = MemoryBackend::new();
        let user = UserId::new("u");
        backend.fail_next_wishlist_writes(1);

        let p = ProductId::new("p");
        assert!(WishlistService::add(&backend, &user, &p).await.is_err());
        assert!(WishlistService::add(&backend, &user, &p).await.is_ok());
        assert_eq!(backend.wishlist_adds(), 1);
    }

    #[tokio::test]
    async fn test_remove_unknown_entry_is_not_found() {
        let backend = MemoryBackend::new();
        let err = WishlistService::remove(&backend, &WishlistEntryId::new("missing"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_addresses_default_first_and_single_default() {
        let backend = MemoryBackend::new();
        let user = UserId::new("u");
        let home = ShippingAddress {
            full_name: "Home".to_string(),
            ..ShippingAddress::default()
        };
        let work = ShippingAddress {
            full_name: "Work".to_string(),
            ..ShippingAddress::default()
        };

        AddressService::add(&backend, &user, &home, true).await.unwrap();
        let work_id = AddressService::add(&backend, &user, &work, true).await.unwrap();

        let listed = AddressService::list(&backend, &user).await.unwrap();
        assert_eq!(listed[0].id, work_id);
        assert_eq!(listed.iter().filter(|a| a.is_default).count(), 1);
    }

    #[tokio::test]
    async fn test_auth_follows_sign_in() {
        let backend = MemoryBackend::new();
        assert!(backend.current_user_id().await.unwrap().is_none());

        backend.sign_in(CurrentUser {
            id: UserId::new("u"),
            email: bazaar_core::Email::parse("u@example.com").unwrap(),
            display_name: None,
        });
        assert_eq!(backend.current_user_id().await.unwrap(), Some(UserId::new("u")));
    }
}
