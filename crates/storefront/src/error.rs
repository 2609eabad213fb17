//! Unified error handling.
//!
//! Each module reports its own `thiserror` enum; [`AppError`] aggregates them
//! for callers that drive whole sessions. Use [`AppError::kind`] to branch on
//! the failure class and [`AppError::user_message`] for text that is safe to
//! show a shopper.

use thiserror::Error;

use bazaar_core::AddressError;

use crate::backend::RemoteError;
use crate::cart::CartError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::wishlist::WishlistError;

/// Broad failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller supplied bad input: empty cart, bad address, bad quantity.
    Validation,
    /// Something referenced does not exist (or can no longer be sold).
    NotFound,
    /// A remote store failed or timed out.
    Remote,
}

/// Application-level error type for the storefront engine.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Wishlist error: {0}")]
    Wishlist(#[from] WishlistError),

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// A store call failed outside the cart, wishlist and checkout flows.
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No user is signed in.
    #[error("Unauthorized")]
    Unauthorized,
}

impl AppError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Cart(CartError::InvalidQuantity) | Self::Address(_) | Self::Config(_) => {
                ErrorKind::Validation
            }
            Self::Cart(CartError::LineNotFound(_)) | Self::Unauthorized => ErrorKind::NotFound,
            Self::Wishlist(e) => e.kind(),
            Self::Checkout(e) => e.kind(),
            Self::Remote(e) => e.kind(),
        }
    }

    /// Whether retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Remote)
    }

    /// A message safe to show the shopper.
    ///
    /// Store failures get a generic message; internal details are not
    /// exposed. Nothing is logged here: failures are logged where they are
    /// raised.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Cart(CartError::InvalidQuantity) => "Quantity must be at least 1".to_string(),
            Self::Cart(CartError::LineNotFound(_)) => "That item is no longer in your cart".to_string(),
            Self::Address(e) | Self::Checkout(CheckoutError::InvalidAddress(e)) => {
                let AddressError::MissingField(field) = e;
                format!("Please enter your {field}")
            }
            Self::Checkout(CheckoutError::EmptyCart) => "Your cart is empty".to_string(),
            Self::Checkout(CheckoutError::ProductNotFound(_)) => {
                "An item in your cart is no longer available".to_string()
            }
            Self::Checkout(CheckoutError::OutOfStock(_)) => {
                "An item in your cart is out of stock".to_string()
            }
            Self::Checkout(CheckoutError::NoPendingDraft) => {
                "There is no order waiting to be placed".to_string()
            }
            Self::Checkout(CheckoutError::Remote(_)) => {
                "We couldn't place your order. Please try again".to_string()
            }
            Self::Wishlist(_) => "We couldn't update your wishlist. Please try again".to_string(),
            Self::Remote(RemoteError::RateLimited(_)) => {
                "Too many requests, please wait a moment".to_string()
            }
            Self::Remote(RemoteError::NotFound(_)) => "Not found".to_string(),
            Self::Remote(_) => "Service unavailable, please try again".to_string(),
            Self::Config(_) => "The store is misconfigured".to_string(),
            Self::Unauthorized => "Please sign in to continue".to_string(),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
