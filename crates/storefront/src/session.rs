//! Per-user session context.
//!
//! A [`Session`] bundles everything that belongs to one signed-in shopper:
//! the cart, the wishlist cache and an order awaiting submission. It is
//! created by the embedding application and passed explicitly; there is no
//! process-wide cart.
//!
//! ```rust,ignore
//! let mut session = Session::start(state).await?;
//! session.add_to_cart(&ProductId::new("p1"), 2).await?;
//! let order_id = session.checkout(&address, PaymentMethod::Card).await?;
//! ```

use tracing::instrument;

use bazaar_core::{
    AddressId, Order, OrderId, PaymentMethod, ProductId, SavedAddress, ShippingAddress, UserId,
};

use crate::backend::RemoteError;
use crate::cart::{Cart, CartError};
use crate::checkout::{Checkout, CheckoutError, OrderDraft};
use crate::error::{AppError, Result};
use crate::models::session::CurrentUser;
use crate::services::timed;
use crate::state::AppState;
use crate::wishlist::Wishlist;

/// A draft that was built but not yet accepted by the order store.
struct PendingOrder {
    draft: OrderDraft,
    /// Whether success should take the ordered lines out of the session cart.
    from_cart: bool,
}

/// One shopper's cart, wishlist and pending order.
pub struct Session {
    state: AppState,
    user: CurrentUser,
    cart: Cart,
    wishlist: Wishlist,
    checkout: Checkout,
    pending: Option<PendingOrder>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user.id)
            .field("cart_lines", &self.cart.lines().len())
            .field("favorites", &self.wishlist.len())
            .field("pending", &self.pending.is_some())
            .finish()
    }
}

impl Session {
    /// Start a session for the signed-in user.
    ///
    /// The cart starts empty and the wishlist is loaded from the store.
    ///
    /// # Errors
    ///
    /// - `AppError::Unauthorized` if nobody is signed in
    /// - `AppError::Remote` / `AppError::Wishlist` if the auth or wishlist
    ///   store fails
    #[instrument(skip_all)]
    pub async fn start(state: AppState) -> Result<Self> {
        let user = timed(state.request_timeout(), state.auth().current_user())
            .await?
            .ok_or(AppError::Unauthorized)?;

        let wishlist = state.new_wishlist();
        wishlist.load(&user.id).await?;

        tracing::info!(user_id = %user.id, favorites = wishlist.len(), "Session started");
        Ok(Self {
            cart: state.new_cart(),
            checkout: state.checkout(),
            wishlist,
            user,
            state,
            pending: None,
        })
    }

    #[must_use]
    pub const fn user(&self) -> &CurrentUser {
        &self.user
    }

    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user.id
    }

    // =========================================================================
    // Cart
    // =========================================================================

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Direct access for quantity changes and removals.
    pub const fn cart_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }

    /// Look a product up and add it to the cart.
    ///
    /// # Errors
    ///
    /// - `AppError::Cart` if `quantity` is zero (checked before any lookup)
    /// - `AppError::Remote` with `RemoteError::NotFound` if the product does
    ///   not exist, or any other lookup failure
    #[instrument(skip(self), fields(user_id = %self.user.id))]
    pub async fn add_to_cart(&mut self, product_id: &ProductId, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity.into());
        }
        let product = timed(
            self.state.request_timeout(),
            self.state.catalog().get_product(product_id),
        )
        .await?
        .ok_or_else(|| RemoteError::NotFound(format!("product {product_id}")))?;

        self.cart.add_item(&product, quantity)?;
        Ok(())
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    #[must_use]
    pub const fn wishlist(&self) -> &Wishlist {
        &self.wishlist
    }

    /// Favorite or unfavorite a product. Returns the new membership.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Wishlist` if the store call fails; the previous
    /// membership is restored.
    pub async fn toggle_favorite(&self, product_id: &ProductId) -> Result<bool> {
        Ok(self.wishlist.toggle(&self.user.id, product_id).await?)
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Place an order for the cart contents.
    ///
    /// The draft is kept as pending until the store accepts it. On success
    /// the ordered quantities are taken out of the cart; on failure the cart
    /// is untouched and the draft can be retried with [`Session::resubmit`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::Checkout` for validation, catalog or store failures.
    #[instrument(skip(self, address), fields(user_id = %self.user.id))]
    pub async fn checkout(
        &mut self,
        address: &ShippingAddress,
        payment_method: PaymentMethod,
    ) -> Result<OrderId> {
        let draft = self
            .checkout
            .build_draft(&self.user.id, self.cart.lines(), address, payment_method)
            .await?;
        self.pending = Some(PendingOrder {
            draft,
            from_cart: true,
        });
        self.submit_pending().await
    }

    /// Order a single product immediately, leaving the cart alone.
    ///
    /// # Errors
    ///
    /// As [`Session::checkout`], plus `AppError::Cart` for a zero quantity.
    #[instrument(skip(self, address), fields(user_id = %self.user.id))]
    pub async fn buy_now(
        &mut self,
        product_id: &ProductId,
        quantity: u32,
        address: &ShippingAddress,
        payment_method: PaymentMethod,
    ) -> Result<OrderId> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity.into());
        }
        let product = timed(
            self.state.request_timeout(),
            self.state.catalog().get_product(product_id),
        )
        .await?
        .ok_or_else(|| CheckoutError::ProductNotFound(product_id.clone()))?;

        let single = Cart::buy_now(self.state.policy(), &product, quantity)?;
        let draft = self
            .checkout
            .build_draft(&self.user.id, single.lines(), address, payment_method)
            .await?;
        self.pending = Some(PendingOrder {
            draft,
            from_cart: false,
        });
        self.submit_pending().await
    }

    /// Retry the pending draft after a failed submission.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NoPendingDraft` if nothing is pending, or the
    /// store error if it fails again.
    #[instrument(skip(self), fields(user_id = %self.user.id))]
    pub async fn resubmit(&mut self) -> Result<OrderId> {
        if self.pending.is_none() {
            return Err(CheckoutError::NoPendingDraft.into());
        }
        self.submit_pending().await
    }

    /// The draft awaiting submission, if the last attempt failed.
    #[must_use]
    pub fn pending_draft(&self) -> Option<&OrderDraft> {
        self.pending.as_ref().map(|pending| &pending.draft)
    }

    /// Drop the pending draft without submitting it.
    pub fn discard_pending(&mut self) -> Option<OrderDraft> {
        self.pending.take().map(|pending| pending.draft)
    }

    async fn submit_pending(&mut self) -> Result<OrderId> {
        let pending = self.pending.as_ref().ok_or(CheckoutError::NoPendingDraft)?;
        let order_id = self.checkout.submit(&pending.draft).await?;

        if pending.from_cart {
            self.cart.remove_ordered(pending.draft.lines());
        }
        self.pending = None;
        Ok(order_id)
    }

    // =========================================================================
    // Orders and addresses
    // =========================================================================

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Remote` if the order store fails.
    pub async fn orders(&self) -> Result<Vec<Order>> {
        Ok(timed(
            self.state.request_timeout(),
            self.state.orders().list_by_user(&self.user.id),
        )
        .await?)
    }

    /// Saved addresses, default first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Remote` if the address store fails.
    pub async fn addresses(&self) -> Result<Vec<SavedAddress>> {
        Ok(timed(
            self.state.request_timeout(),
            self.state.addresses().list(&self.user.id),
        )
        .await?)
    }

    /// The address to pre-fill at checkout: the default, else the first saved.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Remote` if the address store fails.
    pub async fn default_address(&self) -> Result<Option<SavedAddress>> {
        let mut addresses = self.addresses().await?;
        let index = addresses.iter().position(|a| a.is_default).unwrap_or(0);
        Ok((index < addresses.len()).then(|| addresses.swap_remove(index)))
    }

    /// Validate and save an address.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Address` naming the first missing field (before any
    /// network call), or `AppError::Remote` if the store fails.
    #[instrument(skip(self, address), fields(user_id = %self.user.id))]
    pub async fn save_address(
        &self,
        address: &ShippingAddress,
        is_default: bool,
    ) -> Result<AddressId> {
        address.validate()?;
        Ok(timed(
            self.state.request_timeout(),
            self.state.addresses().add(&self.user.id, address, is_default),
        )
        .await?)
    }

    /// Validate and overwrite a saved address.
    ///
    /// # Errors
    ///
    /// As [`Session::save_address`]; a missing address is
    /// `RemoteError::NotFound`.
    pub async fn update_address(
        &self,
        address_id: &AddressId,
        address: &ShippingAddress,
    ) -> Result<()> {
        address.validate()?;
        Ok(timed(
            self.state.request_timeout(),
            self.state.addresses().update(address_id, address),
        )
        .await?)
    }

    /// Delete a saved address.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Remote` if the store fails or the address is gone.
    pub async fn remove_address(&self, address_id: &AddressId) -> Result<()> {
        Ok(timed(
            self.state.request_timeout(),
            self.state.addresses().remove(address_id),
        )
        .await?)
    }
}
