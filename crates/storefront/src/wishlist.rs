//! Wishlist reconciliation.
//!
//! [`Wishlist`] keeps a per-session cache of which products the user has
//! favorited and keeps it in step with the remote [`WishlistService`].
//!
//! # Toggle protocol
//!
//! A toggle is a two-phase optimistic update:
//!
//! 1. **apply**: flip the cached membership to a pending state, so the UI
//!    reflects the change immediately
//! 2. call the store (`add` or `remove`) under the request timeout
//! 3. **confirm** the new state with the store's answer, or **rollback** to
//!    the previous membership and return the error
//!
//! Rollback also runs when the caller drops a toggle before the store
//! answers (an outer timeout or `select!`), so the cache never stays ahead
//! of the store.
//!
//! Toggles on the same product are serialized with a per-product async lock:
//! a second toggle waits for the first to settle and then acts on the
//! confirmed state. Two racing toggles therefore produce exactly one add and
//! one remove. Toggles on different products run independently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::instrument;

use bazaar_core::{Product, ProductId, UserId, WishlistEntryId};

use crate::backend::RemoteError;
use crate::error::ErrorKind;
use crate::services::{CatalogService, WishlistService, timed};

/// Errors reported by wishlist operations.
#[derive(Debug, Error)]
pub enum WishlistError {
    /// The store call failed or timed out. Local state was rolled back.
    #[error("wishlist store error: {0}")]
    Remote(#[from] RemoteError),
}

impl WishlistError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Remote(e) => e.kind(),
        }
    }
}

/// Cached state of one product.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Membership {
    /// Persisted in the store under this entry.
    Confirmed(WishlistEntryId),
    /// Add in flight; no entry ID yet.
    Adding,
    /// Remove of this entry in flight.
    Removing(WishlistEntryId),
}

impl Membership {
    const fn is_favorited(&self) -> bool {
        matches!(self, Self::Confirmed(_) | Self::Adding)
    }
}

/// What `apply` decided to send to the store.
enum Pending {
    Add,
    Remove(WishlistEntryId),
}

/// A user's favorited products, cached locally.
pub struct Wishlist {
    service: Arc<dyn WishlistService>,
    timeout: Duration,
    entries: Mutex<HashMap<ProductId, Membership>>,
    locks: Mutex<HashMap<ProductId, Arc<tokio::sync::Mutex<()>>>>,
}

impl std::fmt::Debug for Wishlist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wishlist")
            .field("entries", &*self.entries.lock())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Wishlist {
    /// Create an empty wishlist. Call [`Wishlist::load`] to populate it.
    #[must_use]
    pub fn new(service: Arc<dyn WishlistService>, timeout: Duration) -> Self {
        Self {
            service,
            timeout,
            entries: Mutex::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the cached set with the store's listing.
    ///
    /// If the store holds several entries for one product, the first one
    /// listed is kept.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::Remote` if the listing fails; the cache is left
    /// untouched.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn load(&self, user_id: &UserId) -> Result<usize, WishlistError> {
        let listed = timed(self.timeout, self.service.list(user_id)).await?;

        let mut fresh = HashMap::with_capacity(listed.len());
        for entry in listed {
            fresh
                .entry(entry.product_id)
                .or_insert(Membership::Confirmed(entry.id));
        }

        let count = fresh.len();
        *self.entries.lock() = fresh;
        tracing::debug!(count, "Wishlist loaded");
        Ok(count)
    }

    /// Favorite the product if it is not favorited, otherwise unfavorite it.
    ///
    /// Returns the new membership: `true` if the product is now favorited.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::Remote` if the store call fails or times out.
    /// The cached membership is restored to what it was before the toggle.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn toggle(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<bool, WishlistError> {
        let lease = self.lease(product_id);
        let _guard = lease.lock.lock().await;
        let (pending, transition) = self.apply(product_id);
        match pending {
            Pending::Add => self.add(user_id, transition).await.map(|()| true),
            Pending::Remove(entry_id) => self
                .remove_entry(transition, entry_id)
                .await
                .map(|()| false),
        }
    }

    /// Unfavorite a product. Returns `false` if it was not favorited.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::Remote` if the store call fails; the product
    /// stays favorited.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove(&self, product_id: &ProductId) -> Result<bool, WishlistError> {
        let lease = self.lease(product_id);
        let _guard = lease.lock.lock().await;
        let confirmed = matches!(
            self.entries.lock().get(product_id),
            Some(Membership::Confirmed(_))
        );
        if !confirmed {
            return Ok(false);
        }
        match self.apply(product_id) {
            (Pending::Remove(entry_id), transition) => self
                .remove_entry(transition, entry_id)
                .await
                .map(|()| true),
            // Confirmed membership always applies as a remove
            (Pending::Add, _) => Ok(false),
        }
    }

    /// Whether the product is favorited. Pending adds count; pending removes
    /// do not.
    #[must_use]
    pub fn is_favorited(&self, product_id: &ProductId) -> bool {
        self.entries
            .lock()
            .get(product_id)
            .is_some_and(Membership::is_favorited)
    }

    /// Favorited product IDs, sorted.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<_> = self
            .entries
            .lock()
            .iter()
            .filter(|(_, m)| m.is_favorited())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|m| m.is_favorited())
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every cached entry, e.g. on sign-out.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Resolve favorited products against the catalog.
    ///
    /// Products that no longer exist are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::Remote` if a catalog lookup fails.
    #[instrument(skip_all)]
    pub async fn products(
        &self,
        catalog: &dyn CatalogService,
    ) -> Result<Vec<Product>, WishlistError> {
        let ids = self.product_ids();
        let mut products = Vec::with_capacity(ids.len());
        for id in ids {
            match timed(self.timeout, catalog.get_product(&id)).await? {
                Some(product) => products.push(product),
                None => tracing::warn!(product_id = %id, "Favorited product no longer exists"),
            }
        }
        Ok(products)
    }

    // =========================================================================
    // Two-phase steps
    // =========================================================================

    /// Flip the cached membership to a pending state.
    ///
    /// The returned [`Transition`] rolls the change back unless it is
    /// confirmed, including when the toggle future is dropped mid-flight.
    fn apply<'a>(&'a self, product_id: &'a ProductId) -> (Pending, Transition<'a>) {
        let mut entries = self.entries.lock();
        let (pending, previous, next) = match entries.get(product_id) {
            Some(Membership::Confirmed(entry_id)) => (
                Pending::Remove(entry_id.clone()),
                Some(entry_id.clone()),
                Membership::Removing(entry_id.clone()),
            ),
            // Pending states cannot be observed here while the product lock
            // is held, so anything else is treated as not favorited.
            _ => (Pending::Add, None, Membership::Adding),
        };
        entries.insert(product_id.clone(), next);

        let transition = Transition {
            wishlist: self,
            product_id,
            previous,
            settled: false,
        };
        (pending, transition)
    }

    /// Record a settled membership: favorited under `entry_id`, or absent.
    fn settle(&self, product_id: &ProductId, entry_id: Option<WishlistEntryId>) {
        let mut entries = self.entries.lock();
        match entry_id {
            Some(id) => {
                entries.insert(product_id.clone(), Membership::Confirmed(id));
            }
            None => {
                entries.remove(product_id);
            }
        }
    }

    async fn add(&self, user_id: &UserId, transition: Transition<'_>) -> Result<(), WishlistError> {
        let entry_id = timed(
            self.timeout,
            self.service.add(user_id, transition.product_id),
        )
        .await?;
        tracing::info!(entry_id = %entry_id, "Added to wishlist");
        transition.confirm(Some(entry_id));
        Ok(())
    }

    async fn remove_entry(
        &self,
        transition: Transition<'_>,
        entry_id: WishlistEntryId,
    ) -> Result<(), WishlistError> {
        match timed(self.timeout, self.service.remove(&entry_id)).await {
            Ok(()) => {
                tracing::info!(entry_id = %entry_id, "Removed from wishlist");
                transition.confirm(None);
                Ok(())
            }
            // Already gone from the store, which is the state we wanted.
            Err(e) if e.is_not_found() => {
                tracing::debug!(entry_id = %entry_id, "Wishlist entry already removed");
                transition.confirm(None);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Per-product locks
    // =========================================================================

    fn lease<'a>(&'a self, product_id: &'a ProductId) -> LockLease<'a> {
        let lock = Arc::clone(self.locks.lock().entry(product_id.clone()).or_default());
        LockLease {
            wishlist: self,
            product_id,
            lock,
        }
    }
}

/// A membership change applied locally and awaiting the store.
///
/// Dropping it without [`Transition::confirm`] restores the membership held
/// before [`Wishlist::apply`].
struct Transition<'a> {
    wishlist: &'a Wishlist,
    product_id: &'a ProductId,
    previous: Option<WishlistEntryId>,
    settled: bool,
}

impl Transition<'_> {
    fn confirm(mut self, entry_id: Option<WishlistEntryId>) {
        self.wishlist.settle(self.product_id, entry_id);
        self.settled = true;
    }

    fn rollback(&mut self) {
        tracing::warn!(product_id = %self.product_id, "Rolling back wishlist toggle");
        self.wishlist.settle(self.product_id, self.previous.take());
    }
}

impl Drop for Transition<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.rollback();
        }
    }
}

/// A handle on one product's lock.
///
/// On drop the lock leaves the table once no other caller holds it, so
/// cancelled waiters do not leak entries.
struct LockLease<'a> {
    wishlist: &'a Wishlist,
    product_id: &'a ProductId,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for LockLease<'_> {
    fn drop(&mut self) {
        let mut locks = self.wishlist.locks.lock();
        // One reference in the table, one here.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(self.product_id);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::Money;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::backend::MemoryBackend;

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn setup() -> (Arc<MemoryBackend>, Wishlist, UserId) {
        let backend = Arc::new(MemoryBackend::new());
        let wishlist = Wishlist::new(backend.clone(), TIMEOUT);
        (backend, wishlist, UserId::new("u1"))
    }

    #[tokio::test]
    async fn test_toggle_twice_round_trips() {
        let (backend, wishlist, user) = setup();
        let p = ProductId::new("p1");

        assert!(wishlist.toggle(&user, &p).await.unwrap());
        assert!(wishlist.is_favorited(&p));
        assert_eq!(backend.wishlist_entries(&user).len(), 1);

        assert!(!wishlist.toggle(&user, &p).await.unwrap());
        assert!(!wishlist.is_favorited(&p));
        assert!(backend.wishlist_entries(&user).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_racing_toggles_are_serialized() {
        let backend = Arc::new(MemoryBackend::new().with_latency(Duration::from_millis(20)));
        let wishlist = Wishlist::new(backend.clone(), TIMEOUT);
        let user = UserId::new("u1");
        let p = ProductId::new("p1");

        let (first, second) = tokio::join!(wishlist.toggle(&user, &p), wishlist.toggle(&user, &p));

        assert!(first.unwrap());
        assert!(!second.unwrap());
        assert_eq!(backend.wishlist_adds(), 1);
        assert_eq!(backend.wishlist_removes(), 1);
        assert!(!wishlist.is_favorited(&p));
        assert!(wishlist.locks.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_toggle_rolls_back() {
        let backend = Arc::new(MemoryBackend::new().with_latency(Duration::from_millis(500)));
        let wishlist = Wishlist::new(backend.clone(), TIMEOUT);
        let user = UserId::new("u1");
        let p = ProductId::new("p1");

        let cancelled =
            tokio::time::timeout(Duration::from_millis(100), wishlist.toggle(&user, &p)).await;
        assert!(cancelled.is_err());
        assert!(!wishlist.is_favorited(&p));
        assert!(backend.wishlist_entries(&user).is_empty());
        assert!(wishlist.locks.lock().is_empty());

        // The next toggle acts on the restored state
        assert!(wishlist.toggle(&user, &p).await.unwrap());
        assert_eq!(backend.wishlist_adds(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_remove_keeps_favorite() {
        let backend = Arc::new(MemoryBackend::new().with_latency(Duration::from_millis(500)));
        let wishlist = Wishlist::new(backend.clone(), TIMEOUT);
        let user = UserId::new("u1");
        let p = ProductId::new("p1");
        backend.seed_wishlist_entry(&user, &p);
        wishlist.load(&user).await.unwrap();

        let cancelled =
            tokio::time::timeout(Duration::from_millis(100), wishlist.toggle(&user, &p)).await;
        assert!(cancelled.is_err());
        assert!(wishlist.is_favorited(&p));

        assert!(!wishlist.toggle(&user, &p).await.unwrap());
        assert!(backend.wishlist_entries(&user).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_waiter_releases_lock() {
        let backend = Arc::new(MemoryBackend::new().with_latency(Duration::from_millis(500)));
        let wishlist = Wishlist::new(backend.clone(), TIMEOUT);
        let user = UserId::new("u1");
        let p = ProductId::new("p1");

        let (first, second) = tokio::join!(
            wishlist.toggle(&user, &p),
            tokio::time::timeout(Duration::from_millis(100), wishlist.toggle(&user, &p))
        );

        assert!(first.unwrap());
        assert!(second.is_err());
        assert!(wishlist.is_favorited(&p));
        assert!(wishlist.locks.lock().is_empty());
    }

    #[tokio::test]
    async fn test_failed_add_rolls_back() {
        let (backend, wishlist, user) = setup();
        let p = ProductId::new("p1");
        backend.fail_next_wishlist_writes(1);

        let err = wishlist.toggle(&user, &p).await.unwrap_err();
        assert!(matches!(err, WishlistError::Remote(_)));
        assert!(!wishlist.is_favorited(&p));
        assert!(wishlist.is_empty());
    }

    #[tokio::test]
    async fn test_failed_remove_rolls_back() {
        let (backend, wishlist, user) = setup();
        let p = ProductId::new("p1");
        wishlist.toggle(&user, &p).await.unwrap();
        backend.fail_next_wishlist_writes(1);

        assert!(wishlist.toggle(&user, &p).await.is_err());
        assert!(wishlist.is_favorited(&p));

        // The entry ID survived the rollback, so the next remove works.
        assert!(!wishlist.toggle(&user, &p).await.unwrap());
        assert!(backend.wishlist_entries(&user).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_rolls_back() {
        let backend = Arc::new(MemoryBackend::new().with_latency(Duration::from_secs(30)));
        let wishlist = Wishlist::new(backend.clone(), Duration::from_millis(100));
        let user = UserId::new("u1");
        let p = ProductId::new("p1");

        let err = wishlist.toggle(&user, &p).await.unwrap_err();
        assert!(matches!(err, WishlistError::Remote(RemoteError::Timeout(_))));
        assert!(!wishlist.is_favorited(&p));
    }

    #[tokio::test]
    async fn test_load_replaces_cache() {
        let (backend, wishlist, user) = setup();
        wishlist.toggle(&user, &ProductId::new("local")).await.unwrap();
        backend.clear_wishlist(&user);
        backend.seed_wishlist_entry(&user, &ProductId::new("a"));
        backend.seed_wishlist_entry(&user, &ProductId::new("b"));

        assert_eq!(wishlist.load(&user).await.unwrap(), 2);
        assert_eq!(
            wishlist.product_ids(),
            [ProductId::new("a"), ProductId::new("b")]
        );
    }

    #[tokio::test]
    async fn test_load_collapses_duplicates() {
        let (backend, wishlist, user) = setup();
        let p = ProductId::new("p1");
        let first = backend.seed_wishlist_entry(&user, &p);
        backend.seed_wishlist_entry(&user, &p);

        assert_eq!(wishlist.load(&user).await.unwrap(), 1);
        assert_eq!(
            wishlist.entries.lock().get(&p),
            Some(&Membership::Confirmed(first))
        );
    }

    #[tokio::test]
    async fn test_remove_not_favorited_is_noop() {
        let (backend, wishlist, _) = setup();
        assert!(!wishlist.remove(&ProductId::new("p1")).await.unwrap());
        assert_eq!(backend.wishlist_removes(), 0);
    }

    #[tokio::test]
    async fn test_remove_tolerates_missing_entry() {
        let (backend, wishlist, user) = setup();
        let p = ProductId::new("p1");
        wishlist.toggle(&user, &p).await.unwrap();
        backend.clear_wishlist(&user);

        assert!(wishlist.remove(&p).await.unwrap());
        assert!(!wishlist.is_favorited(&p));
    }

    #[tokio::test]
    async fn test_products_skips_missing() {
        let (backend, wishlist, user) = setup();
        backend.insert_product(
            Product::new("kept", "Kept", "Home", Money::new(dec!(5.00))).unwrap(),
        );
        wishlist.toggle(&user, &ProductId::new("kept")).await.unwrap();
        wishlist.toggle(&user, &ProductId::new("gone")).await.unwrap();

        let products = wishlist.products(backend.as_ref()).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id().as_str(), "kept");
    }
}
