//! Bazaar storefront engine.
//!
//! Cart pricing, wishlist reconciliation and order drafting for the Bazaar
//! mobile storefront, backed by a remote document store.
//!
//! - [`cart`]: the cart model and the shipping/tax policy
//! - [`wishlist`]: the cached favorites set and its toggle protocol
//! - [`checkout`]: immutable order drafts and submission
//! - [`session`]: the per-user context tying them together
//! - [`services`] and [`backend`]: the remote store seams and their REST and
//!   in-memory implementations

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod state;
pub mod wishlist;

pub use error::{AppError, ErrorKind, Result};
pub use session::Session;
pub use state::{AppState, Services};
